use super::handle::MockHandle;
use crate::logging;
use crate::Result;

/// A set of mocks that are enabled and disabled together.
#[derive(Debug, Default)]
pub struct MockEnvironment {
    mocks: Vec<MockHandle>,
}

impl MockEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_mock(&mut self, mock: MockHandle) {
        self.mocks.push(mock);
    }

    pub fn with_mock(mut self, mock: MockHandle) -> Self {
        self.add_mock(mock);
        self
    }

    pub fn mocks(&self) -> &[MockHandle] {
        &self.mocks
    }

    pub fn is_enabled(&self) -> bool {
        !self.mocks.is_empty() && self.mocks.iter().all(MockHandle::is_enabled)
    }

    /// Enable every mock in insertion order.
    ///
    /// If one fails, the mocks enabled by this call are disabled again and
    /// the error is returned.
    pub fn enable(&mut self) -> Result<()> {
        for index in 0..self.mocks.len() {
            if let Err(err) = self.mocks[index].enable() {
                for mock in &mut self.mocks[..index] {
                    mock.disable();
                }
                logging::log_environment_rollback(self.mocks[index].key(), index);
                return Err(err);
            }
        }
        Ok(())
    }

    /// Disable every mock. Already disabled mocks are left alone.
    pub fn disable(&mut self) {
        for mock in &mut self.mocks {
            mock.disable();
        }
    }
}

impl FromIterator<MockHandle> for MockEnvironment {
    fn from_iter<I: IntoIterator<Item = MockHandle>>(iter: I) -> Self {
        Self {
            mocks: iter.into_iter().collect(),
        }
    }
}
