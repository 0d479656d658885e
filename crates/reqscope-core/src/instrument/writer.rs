/// Status recorded when a handler never sets one.
pub const DEFAULT_STATUS: u16 = 200;

/// Response-writing capability handed to handlers.
pub trait ResponseWriter: Send {
    fn write_status(&mut self, status: u16);
    fn write_body(&mut self, chunk: &[u8]);
}

/// Forwards every call to the wrapped writer and remembers the first status.
///
/// Writing a body before any status commits `DEFAULT_STATUS`, so later
/// status writes are forwarded but not recorded.
pub struct StatusRecorder<'a> {
    inner: &'a mut dyn ResponseWriter,
    status: Option<u16>,
}

impl<'a> StatusRecorder<'a> {
    pub fn new(inner: &'a mut dyn ResponseWriter) -> Self {
        Self {
            inner,
            status: None,
        }
    }

    /// The committed status, if any.
    pub fn explicit_status(&self) -> Option<u16> {
        self.status
    }

    /// The committed status, or `DEFAULT_STATUS`.
    pub fn status(&self) -> u16 {
        self.status.unwrap_or(DEFAULT_STATUS)
    }
}

impl ResponseWriter for StatusRecorder<'_> {
    fn write_status(&mut self, status: u16) {
        self.status.get_or_insert(status);
        self.inner.write_status(status);
    }

    fn write_body(&mut self, chunk: &[u8]) {
        self.status.get_or_insert(DEFAULT_STATUS);
        self.inner.write_body(chunk);
    }
}

/// In-memory response. First status wins, like a real connection.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BufferedResponse {
    status: Option<u16>,
    body: Vec<u8>,
}

impl BufferedResponse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> u16 {
        self.status.unwrap_or(DEFAULT_STATUS)
    }

    /// Status set by a status write or implied by a body write.
    pub fn explicit_status(&self) -> Option<u16> {
        self.status
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn into_parts(self) -> (u16, Vec<u8>) {
        (self.status.unwrap_or(DEFAULT_STATUS), self.body)
    }
}

impl ResponseWriter for BufferedResponse {
    fn write_status(&mut self, status: u16) {
        if self.status.is_none() {
            self.status = Some(status);
        } else {
            tracing::debug!(status, "superfluous status write ignored");
        }
    }

    fn write_body(&mut self, chunk: &[u8]) {
        self.status.get_or_insert(DEFAULT_STATUS);
        self.body.extend_from_slice(chunk);
    }
}
