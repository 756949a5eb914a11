//! Step tracing: every page-object action runs inside a named
//! `Owner.action` span.
//!
//! Wrapping is an ordinary higher-order call. [`step`] is fully transparent,
//! [`try_step`] additionally marks the span failed when the action returns
//! `Err`, and neither changes the value that comes back. Nesting follows the
//! `tracing` span context: a step started while another step's future is being
//! polled becomes its child.
//!
//! [`StepRecorder`] is a `tracing_subscriber` layer that rebuilds the span
//! tree for reports.

use std::fmt::{self, Display};
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::field::{Field, Visit};
use tracing::instrument::Instrumented;
use tracing::span::{Attributes, Id, Record};
use tracing::{Instrument, Span, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

/// Target every step span is emitted under
pub const STEP_TARGET: &str = "finprobe::step";

const STEP_FIELD: &str = "step";
const ERROR_FIELD: &str = "error";

/// `Owner.action` label of one step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StepName {
    pub owner: &'static str,
    pub action: &'static str,
}

impl StepName {
    #[must_use]
    pub const fn new(owner: &'static str, action: &'static str) -> Self {
        Self { owner, action }
    }
}

impl Display for StepName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.owner, self.action)
    }
}

fn step_span(name: StepName) -> Span {
    tracing::info_span!(
        target: STEP_TARGET,
        "step",
        step = %name,
        error = tracing::field::Empty
    )
}

/// Run `fut` inside a step span; the output is returned untouched
pub fn step<F: Future>(name: StepName, fut: F) -> Instrumented<F> {
    fut.instrument(step_span(name))
}

/// Like [`step`], recording the error message on the span when `fut` fails.
/// The identical `Err` value is returned.
pub fn try_step<T, E, F>(name: StepName, fut: F) -> impl Future<Output = Result<T, E>>
where
    E: Display,
    F: Future<Output = Result<T, E>>,
{
    let span = step_span(name);
    let recorder = span.clone();
    async move {
        let out = fut.await;
        if let Err(e) = &out {
            recorder.record(ERROR_FIELD, tracing::field::display(e));
        }
        out
    }
    .instrument(span)
}

/// Types whose actions are reported as `NAME.action` steps
pub trait Traced {
    /// Owner half of the step label
    const NAME: &'static str;

    fn step_name(&self, action: &'static str) -> StepName {
        StepName::new(Self::NAME, action)
    }

    /// [`step`] under this owner
    fn step<F: Future>(&self, action: &'static str, fut: F) -> Instrumented<F> {
        step(self.step_name(action), fut)
    }

    /// [`try_step`] under this owner
    fn try_step<T, E, F>(&self, action: &'static str, fut: F) -> impl Future<Output = Result<T, E>>
    where
        E: Display,
        F: Future<Output = Result<T, E>>,
    {
        try_step(self.step_name(action), fut)
    }
}

/// Outcome of a finished step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "message", rename_all = "lowercase")]
pub enum StepStatus {
    Passed,
    Failed(String),
}

/// One finished step with its nested steps
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepNode {
    pub name: String,
    #[serde(with = "duration_ms")]
    pub duration: Duration,
    #[serde(flatten)]
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<StepNode>,
}

impl StepNode {
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self.status, StepStatus::Failed(_))
    }

    /// Depth-first search by label
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&Self> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(name))
    }

    /// Innermost failed step along the first failing branch
    #[must_use]
    pub fn deepest_failure(&self) -> Option<&Self> {
        if !self.is_failed() {
            return None;
        }
        self.children
            .iter()
            .find_map(Self::deepest_failure)
            .or(Some(self))
    }

    /// Number of steps in this subtree
    #[must_use]
    pub fn len(&self) -> usize {
        1 + self.children.iter().map(Self::len).sum::<usize>()
    }
}

/// Serde adapter storing a `Duration` as whole milliseconds
pub(crate) mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

/// In-flight step, kept in the span's extensions
struct OpenStep {
    name: String,
    started: Instant,
    error: Option<String>,
    children: Vec<StepNode>,
}

#[derive(Default)]
struct StepFields {
    step: Option<String>,
    error: Option<String>,
}

impl Visit for StepFields {
    fn record_str(&mut self, field: &Field, value: &str) {
        match field.name() {
            STEP_FIELD => self.step = Some(value.to_string()),
            ERROR_FIELD => self.error = Some(value.to_string()),
            _ => {}
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        match field.name() {
            STEP_FIELD => self.step = Some(format!("{value:?}")),
            ERROR_FIELD => self.error = Some(format!("{value:?}")),
            _ => {}
        }
    }
}

/// Collects finished steps into a tree
#[derive(Debug, Clone, Default)]
pub struct StepRecorder {
    roots: Arc<Mutex<Vec<StepNode>>>,
}

impl StepRecorder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Finished top-level steps, oldest first
    #[must_use]
    pub fn steps(&self) -> Vec<StepNode> {
        self.roots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Drain finished top-level steps
    #[must_use]
    pub fn take(&self) -> Vec<StepNode> {
        std::mem::take(&mut *self.roots.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl<S> Layer<S> for StepRecorder
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let meta = attrs.metadata();
        if meta.target() != STEP_TARGET {
            return;
        }
        let mut fields = StepFields::default();
        attrs.record(&mut fields);
        let Some(name) = fields.step else { return };
        if let Some(span) = ctx.span(id) {
            span.extensions_mut().insert(OpenStep {
                name,
                started: Instant::now(),
                error: fields.error,
                children: Vec::new(),
            });
        }
    }

    fn on_record(&self, id: &Id, values: &Record<'_>, ctx: Context<'_, S>) {
        let mut fields = StepFields::default();
        values.record(&mut fields);
        let Some(error) = fields.error else { return };
        if let Some(span) = ctx.span(id) {
            if let Some(open) = span.extensions_mut().get_mut::<OpenStep>() {
                open.error = Some(error);
            }
        }
    }

    fn on_close(&self, id: Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(&id) else { return };
        let Some(open) = span.extensions_mut().remove::<OpenStep>() else {
            return;
        };
        let node = StepNode {
            name: open.name,
            duration: open.started.elapsed(),
            status: open.error.map_or(StepStatus::Passed, StepStatus::Failed),
            children: open.children,
        };

        let parent = span.scope().skip(1).find(|ancestor| {
            ancestor.extensions().get::<OpenStep>().is_some()
        });
        match parent {
            Some(parent) => {
                if let Some(open) = parent.extensions_mut().get_mut::<OpenStep>() {
                    open.children.push(node);
                }
            }
            None => self
                .roots
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(node),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::Registry;

    struct Widget;

    impl Traced for Widget {
        const NAME: &'static str = "Widget";
    }

    impl Widget {
        async fn inner(&self, fail: bool) -> Result<u32, String> {
            self.try_step("inner", async move {
                if fail {
                    Err("boom".to_string())
                } else {
                    Ok(7)
                }
            })
            .await
        }

        async fn outer(&self, fail: bool) -> Result<u32, String> {
            self.try_step("outer", async move {
                let a = self.inner(false).await?;
                let b = self.inner(fail).await?;
                Ok(a + b)
            })
            .await
        }
    }

    fn recording() -> (StepRecorder, tracing::subscriber::DefaultGuard) {
        let recorder = StepRecorder::new();
        let guard = tracing::subscriber::set_default(Registry::default().with(recorder.clone()));
        (recorder, guard)
    }

    mod transparency_tests {
        use super::*;

        #[tokio::test]
        async fn test_step_returns_value_unchanged() {
            let v = step(StepName::new("A", "b"), async { vec![1, 2, 3] }).await;
            assert_eq!(v, vec![1, 2, 3]);
            let borrowed = "kept";
            let r = step(StepName::new("A", "c"), async { borrowed }).await;
            assert!(std::ptr::eq(r, borrowed));
        }

        #[tokio::test]
        async fn test_try_step_returns_identical_error() {
            let (_recorder, _guard) = recording();
            let err = Widget.inner(true).await.unwrap_err();
            assert_eq!(err, "boom");
        }

        #[test]
        fn test_step_name_display() {
            assert_eq!(StepName::new("AuthPage", "login").to_string(), "AuthPage.login");
            assert_eq!(Widget.step_name("x").to_string(), "Widget.x");
        }
    }

    mod recorder_tests {
        use super::*;

        #[tokio::test]
        async fn test_nested_steps_form_tree() {
            let (recorder, _guard) = recording();
            assert_eq!(Widget.outer(false).await.unwrap(), 14);

            let roots = recorder.steps();
            assert_eq!(roots.len(), 1);
            let outer = &roots[0];
            assert_eq!(outer.name, "Widget.outer");
            assert_eq!(outer.status, StepStatus::Passed);
            assert_eq!(outer.children.len(), 2);
            assert!(outer.children.iter().all(|c| c.name == "Widget.inner"));
            assert_eq!(outer.len(), 3);
        }

        #[tokio::test]
        async fn test_failure_marks_every_enclosing_step() {
            let (recorder, _guard) = recording();
            Widget.outer(true).await.unwrap_err();

            let roots = recorder.take();
            let outer = &roots[0];
            assert_eq!(outer.status, StepStatus::Failed("boom".into()));
            assert_eq!(outer.children[0].status, StepStatus::Passed);
            let deepest = outer.deepest_failure().unwrap();
            assert_eq!(deepest.name, "Widget.inner");
            assert!(recorder.steps().is_empty());
        }

        #[tokio::test]
        async fn test_unrelated_spans_are_ignored() {
            let (recorder, _guard) = recording();
            async {}
                .instrument(tracing::info_span!("plain"))
                .await;
            assert!(recorder.steps().is_empty());
        }

        #[test]
        fn test_node_json_shape() {
            let node = StepNode {
                name: "ExpensePage.save_changes".into(),
                duration: Duration::from_millis(1200),
                status: StepStatus::Failed("timeout".into()),
                children: vec![],
            };
            let json = serde_json::to_value(&node).unwrap();
            assert_eq!(json["duration"], 1200);
            assert_eq!(json["status"], "failed");
            assert_eq!(json["message"], "timeout");
            assert!(json.get("children").is_none());
        }
    }
}
