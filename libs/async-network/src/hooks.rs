//! Encrypt/decrypt interception points.
//!
//! An [`Encryptor`] rewrites the raw request before it reaches the transport;
//! a [`Decryptor`] rewrites a successful [`Response`] before it is decoded and
//! returned. Any closure with the right signature implements the matching
//! trait:
//!
//! ```ignore
//! let networking = Networking::builder()
//!     .encryptor(|mut raw: RawRequest| {
//!         raw.headers.insert("x-signature", sign(&raw)?);
//!         Ok(raw)
//!     })
//!     .build()?;
//! ```

use crate::error::BoxError;
use crate::request::RawRequest;
use crate::response::Response;

pub trait Encryptor: Send + Sync {
    /// # Errors
    ///
    /// Any error aborts the send before the transport is called.
    fn encrypt(&self, request: RawRequest) -> Result<RawRequest, BoxError>;
}

pub trait Decryptor: Send + Sync {
    /// # Errors
    ///
    /// Any error aborts the send; the caller sees it unchanged.
    fn decrypt(&self, response: Response) -> Result<Response, BoxError>;
}

impl<F> Encryptor for F
where
    F: Fn(RawRequest) -> Result<RawRequest, BoxError> + Send + Sync,
{
    fn encrypt(&self, request: RawRequest) -> Result<RawRequest, BoxError> {
        self(request)
    }
}

impl<F> Decryptor for F
where
    F: Fn(Response) -> Result<Response, BoxError> + Send + Sync,
{
    fn decrypt(&self, response: Response) -> Result<Response, BoxError> {
        self(response)
    }
}

/// Identity hook, used when no encryptor or decryptor is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

impl Encryptor for Passthrough {
    fn encrypt(&self, request: RawRequest) -> Result<RawRequest, BoxError> {
        Ok(request)
    }
}

impl Decryptor for Passthrough {
    fn decrypt(&self, response: Response) -> Result<Response, BoxError> {
        Ok(response)
    }
}
