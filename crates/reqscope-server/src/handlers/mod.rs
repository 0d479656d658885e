//! Demo business handlers served behind the instrumentation middleware.

mod work;

use async_trait::async_trait;
use reqscope_core::instrument::{Handler, Request, RequestContext, ResponseWriter};
use thiserror::Error;

pub use work::{decode_varint, VarintError, Work, DEFAULT_UNITS, MAX_UNITS};

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("bad request: {0}")]
    BadRequest(String),
}

/// `GET /`
#[derive(Debug, Default, Clone, Copy)]
pub struct Index;

#[async_trait]
impl Handler for Index {
    type Error = HandlerError;

    async fn serve(
        &self,
        _cx: &RequestContext,
        _req: &Request,
        w: &mut dyn ResponseWriter,
    ) -> Result<(), HandlerError> {
        w.write_body(b"ok");
        Ok(())
    }
}

/// `GET /greet`
#[derive(Debug, Default, Clone, Copy)]
pub struct Greet;

#[async_trait]
impl Handler for Greet {
    type Error = HandlerError;

    async fn serve(
        &self,
        _cx: &RequestContext,
        _req: &Request,
        w: &mut dyn ResponseWriter,
    ) -> Result<(), HandlerError> {
        w.write_body(b"hello world");
        Ok(())
    }
}

/// Router fallback. Instrumented like any route, under the `unmatched` path.
#[derive(Debug, Default, Clone, Copy)]
pub struct NotFound;

#[async_trait]
impl Handler for NotFound {
    type Error = HandlerError;

    async fn serve(
        &self,
        _cx: &RequestContext,
        _req: &Request,
        w: &mut dyn ResponseWriter,
    ) -> Result<(), HandlerError> {
        w.write_status(404);
        w.write_body(b"not found");
        Ok(())
    }
}
