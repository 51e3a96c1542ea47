use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Result of a mockable call, mocked or real.
pub type CallResult = std::result::Result<Value, CallError>;

/// Signature shared by real implementations and callable replacements.
pub type CallFn = dyn Fn(&[Value]) -> CallResult + Send + Sync;

/// Failures surfaced to the code that called through a dispatch point
#[derive(Debug, Error)]
pub enum CallError {
    #[error("No case of the mock for {scope}::{name} matches arguments {args}")]
    NoMatchingCase {
        scope: String,
        name: String,
        args: String,
    },

    #[error("The value sequence of the mock for {scope}::{name} is exhausted after {len} calls")]
    SequenceExhausted {
        scope: String,
        name: String,
        len: usize,
    },

    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}

impl CallError {
    /// Wrap any failure message raised by a real implementation or callable.
    pub fn failed(msg: impl fmt::Display) -> Self {
        CallError::Failed(anyhow::anyhow!("{}", msg))
    }
}

/// What to do once a sequence has returned all of its values
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Exhaustion {
    /// Fail every further call with [`CallError::SequenceExhausted`].
    #[default]
    Fail,
    /// Keep returning the last value.
    RepeatLast,
}

/// Failure raised by a replacement before it knows which mock it belongs to.
///
/// [`Interception`](super::Interception) attaches scope and name.
#[derive(Debug)]
pub(crate) enum InvokeError {
    NoMatchingCase(String),
    SequenceExhausted(usize),
    Failed(CallError),
}

/// Behavior substituted for a real function while a mock is enabled
pub enum Replacement {
    /// Ignores arguments and always returns the same value.
    Value(Value),
    /// Returns the stored values one per call, in order.
    Sequence {
        values: Vec<Value>,
        cursor: AtomicUsize,
        exhaustion: Exhaustion,
    },
    /// Looks up the argument list; cases are keyed by its canonical JSON text.
    Map { cases: BTreeMap<String, Value> },
    /// Forwards arguments and result to a user callable.
    Callable(Arc<CallFn>),
}

impl Replacement {
    pub fn value(value: impl Into<Value>) -> Self {
        Replacement::Value(value.into())
    }

    /// A sequence that fails with `SequenceExhausted` after its last value.
    pub fn sequence<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::sequence_with(values, Exhaustion::Fail)
    }

    /// A sequence that keeps returning its last value once exhausted.
    pub fn sequence_repeat_last<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::sequence_with(values, Exhaustion::RepeatLast)
    }

    pub fn sequence_with<I, V>(values: I, exhaustion: Exhaustion) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Replacement::Sequence {
            values: values.into_iter().map(Into::into).collect(),
            cursor: AtomicUsize::new(0),
            exhaustion,
        }
    }

    /// Maps argument lists to results.
    ///
    /// ```
    /// use fnmock::Replacement;
    /// use serde_json::json;
    ///
    /// let greet = Replacement::map([
    ///     (vec![json!("en")], json!("hello")),
    ///     (vec![json!("fr")], json!("bonjour")),
    /// ]);
    /// ```
    pub fn map<I>(cases: I) -> Self
    where
        I: IntoIterator<Item = (Vec<Value>, Value)>,
    {
        Replacement::Map {
            cases: cases
                .into_iter()
                .map(|(args, result)| (case_key(&args), result))
                .collect(),
        }
    }

    pub fn callable<F>(f: F) -> Self
    where
        F: Fn(&[Value]) -> CallResult + Send + Sync + 'static,
    {
        Replacement::Callable(Arc::new(f))
    }

    pub(crate) fn invoke(&self, args: &[Value]) -> Result<Value, InvokeError> {
        match self {
            Replacement::Value(value) => Ok(value.clone()),
            Replacement::Sequence {
                values,
                cursor,
                exhaustion,
            } => {
                let index = cursor.fetch_add(1, Ordering::SeqCst);
                match (values.get(index), exhaustion) {
                    (Some(value), _) => Ok(value.clone()),
                    (None, Exhaustion::RepeatLast) => values
                        .last()
                        .cloned()
                        .ok_or(InvokeError::SequenceExhausted(0)),
                    (None, Exhaustion::Fail) => Err(InvokeError::SequenceExhausted(values.len())),
                }
            }
            Replacement::Map { cases } => {
                let key = case_key(args);
                cases
                    .get(&key)
                    .cloned()
                    .ok_or(InvokeError::NoMatchingCase(key))
            }
            Replacement::Callable(f) => f(args).map_err(InvokeError::Failed),
        }
    }
}

/// Canonical text of an argument list. Object keys are sorted by serde_json.
fn case_key(args: &[Value]) -> String {
    Value::Array(args.to_vec()).to_string()
}

impl Clone for Replacement {
    fn clone(&self) -> Self {
        match self {
            Replacement::Value(value) => Replacement::Value(value.clone()),
            Replacement::Sequence {
                values,
                cursor,
                exhaustion,
            } => Replacement::Sequence {
                values: values.clone(),
                cursor: AtomicUsize::new(cursor.load(Ordering::SeqCst)),
                exhaustion: *exhaustion,
            },
            Replacement::Map { cases } => Replacement::Map {
                cases: cases.clone(),
            },
            Replacement::Callable(f) => Replacement::Callable(Arc::clone(f)),
        }
    }
}

impl fmt::Debug for Replacement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Replacement::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Replacement::Sequence {
                values,
                cursor,
                exhaustion,
            } => f
                .debug_struct("Sequence")
                .field("values", values)
                .field("cursor", &cursor.load(Ordering::SeqCst))
                .field("exhaustion", exhaustion)
                .finish(),
            Replacement::Map { cases } => f.debug_struct("Map").field("cases", cases).finish(),
            Replacement::Callable(_) => f.write_str("Callable(..)"),
        }
    }
}

impl From<Value> for Replacement {
    fn from(value: Value) -> Self {
        Replacement::Value(value)
    }
}
