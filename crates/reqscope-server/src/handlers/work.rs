use std::time::Duration;

use async_trait::async_trait;
use reqscope_core::instrument::{Handler, Request, RequestContext, ResponseWriter};
use reqscope_core::trace::{Attribute, Status};
use thiserror::Error;

use super::HandlerError;

pub const DEFAULT_UNITS: u32 = 10;
pub const MAX_UNITS: u32 = 100;

/// Input handed to every unit of work.
const PAYLOAD: [u8; 4] = [0xFF, 0x00, 0x00, 0x00];

const MAX_VARINT_LEN: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VarintError {
    #[error("EOF")]
    Empty,
    #[error("unexpected EOF")]
    Truncated,
    #[error("varint overflows a 64-bit integer")]
    Overflow,
}

/// Decode a zig-zag encoded signed varint. Returns the value and the number
/// of bytes consumed.
pub fn decode_varint(buf: &[u8]) -> Result<(i64, usize), VarintError> {
    if buf.is_empty() {
        return Err(VarintError::Empty);
    }

    let mut ux: u64 = 0;
    let mut shift = 0u32;
    for (i, &b) in buf.iter().enumerate() {
        if i == MAX_VARINT_LEN {
            return Err(VarintError::Overflow);
        }
        if b < 0x80 {
            if i == MAX_VARINT_LEN - 1 && b > 1 {
                return Err(VarintError::Overflow);
            }
            ux |= u64::from(b) << shift;
            let mut x = (ux >> 1) as i64;
            if ux & 1 != 0 {
                x = !x;
            }
            return Ok((x, i + 1));
        }
        ux |= u64::from(b & 0x7f) << shift;
        shift += 7;
    }
    Err(VarintError::Truncated)
}

/// `GET /work?units=N`
///
/// Opens a `work` span under the request span and runs `N` sequential units
/// of work, each in its own `doWork` child span.
#[derive(Debug, Clone, Copy)]
pub struct Work {
    step: Duration,
}

impl Work {
    /// `step` is the simulated duration of one unit.
    pub fn new(step: Duration) -> Self {
        Self { step }
    }

    async fn do_work(&self, cx: &RequestContext) {
        let mut span = cx.start_span("doWork");
        tracing::debug!("doing busy work");
        tokio::time::sleep(self.step * 4 / 5).await;

        let n = match decode_varint(&PAYLOAD) {
            Ok((n, _)) => n,
            Err(e) => {
                span.set_status(Status::unknown(e.to_string()));
                0
            }
        };
        span.annotate("Invoking doWork", vec![Attribute::new("bytes to int", n)]);

        tokio::time::sleep(self.step / 5).await;
        span.end();
    }
}

impl Default for Work {
    fn default() -> Self {
        Self::new(Duration::from_millis(100))
    }
}

#[async_trait]
impl Handler for Work {
    type Error = HandlerError;

    async fn serve(
        &self,
        cx: &RequestContext,
        req: &Request,
        w: &mut dyn ResponseWriter,
    ) -> Result<(), HandlerError> {
        let units = match req.query_param("units") {
            None => DEFAULT_UNITS,
            Some(raw) => match raw.parse::<u32>() {
                Ok(n) if n <= MAX_UNITS => n,
                _ => {
                    w.write_status(400);
                    return Err(HandlerError::BadRequest(format!(
                        "units must be an integer between 0 and {MAX_UNITS}, got {raw:?}"
                    )));
                }
            },
        };

        let work = cx.start_span("work");
        let work_cx = cx.with_span(work.context());
        for _ in 0..units {
            self.do_work(&work_cx).await;
        }
        work.end();

        w.write_body(format!("completed {units} units of work").as_bytes());
        Ok(())
    }
}
