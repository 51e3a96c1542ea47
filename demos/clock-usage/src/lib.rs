use fnmock::CallError;

/// A login session that expires `ttl` seconds after it starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    pub started_at: u64,
    pub ttl: u64,
}

impl Session {
    pub fn start(ttl: u64) -> Result<Self, CallError> {
        Ok(Self {
            started_at: fnmock_clock::time()?,
            ttl,
        })
    }

    pub fn is_expired(&self) -> Result<bool, CallError> {
        Ok(fnmock_clock::seconds_since(self.started_at)? >= self.ttl)
    }

    /// Wait out the rest of the session.
    pub fn wait_until_expired(&self) -> Result<(), CallError> {
        let elapsed = fnmock_clock::seconds_since(self.started_at)?;
        if elapsed < self.ttl {
            fnmock_clock::sleep(self.ttl - elapsed)?;
        }
        Ok(())
    }
}
