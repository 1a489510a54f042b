//! Event-type extraction from the generic argument bound at each call site.
//!
//! The bus API is expected to be `Publish<TEvent>(...)`-shaped: exactly one
//! type argument names the event. Calls with none (a non-generic surface)
//! or several (no policy for choosing) are dropped on purpose.

use std::fmt;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::collector::CallSite;
use crate::index::{CodeIndex, ResolvedMethodCall};

/// Name of an event type. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventType(String);

impl EventType {
    /// Returns `None` for an empty or blank name.
    pub fn new(name: impl Into<String>) -> Option<Self> {
        let name = name.into();
        let trimmed = name.trim();
        if trimmed.is_empty() {
            None
        } else if trimmed.len() == name.len() {
            Some(Self(name))
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A call site paired with the event type it publishes or subscribes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedSite {
    pub site: CallSite,
    pub event_type: EventType,
}

/// Outcome of inspecting one resolved invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    /// Exactly one usable type argument.
    Tagged(EventType),
    /// No invocation or method could be resolved at the location.
    Unresolved,
    /// The method was invoked without a type argument.
    NoTypeArgument,
    /// More than one type argument; the site is dropped.
    Ambiguous(Vec<String>),
}

/// Classify a resolved invocation by its type arguments.
pub fn classify(resolved: Option<&ResolvedMethodCall>) -> Extraction {
    let Some(call) = resolved else {
        return Extraction::Unresolved;
    };

    match call.type_arguments.as_slice() {
        [] => Extraction::NoTypeArgument,
        [single] => match EventType::new(single.as_str()) {
            Some(event_type) => Extraction::Tagged(event_type),
            None => Extraction::NoTypeArgument,
        },
        many => Extraction::Ambiguous(many.to_vec()),
    }
}

/// Pair each call site with its event type, dropping sites without exactly
/// one type argument.
///
/// Output order follows input order.
pub async fn extract_event_types(index: &dyn CodeIndex, sites: Vec<CallSite>) -> Vec<TaggedSite> {
    let total = sites.len();
    let resolutions = join_all(sites.into_iter().map(|site| async move {
        let resolved = index.resolve_invocation_at(&site.location()).await;
        (site, resolved)
    }))
    .await;

    let mut tagged = Vec::with_capacity(total);
    let (mut unresolved, mut untyped, mut ambiguous) = (0usize, 0usize, 0usize);

    for (site, resolved) in resolutions {
        match classify(resolved.as_ref()) {
            Extraction::Tagged(event_type) => tagged.push(TaggedSite { site, event_type }),
            Extraction::Unresolved => {
                unresolved += 1;
                debug!(
                    location = %site.location(),
                    "No resolvable invocation at call site, skipping"
                );
            }
            Extraction::NoTypeArgument => {
                untyped += 1;
                debug!(
                    location = %site.location(),
                    class = %site.class_name,
                    method = %site.method_name,
                    "Invocation has no type argument, skipping"
                );
            }
            Extraction::Ambiguous(arguments) => {
                ambiguous += 1;
                warn!(
                    location = %site.location(),
                    arguments = ?arguments,
                    "ambiguous: {} type arguments, expected 1",
                    arguments.len()
                );
            }
        }
    }

    info!(
        sites = total,
        tagged = tagged.len(),
        unresolved,
        untyped,
        ambiguous,
        "Extracted event types"
    );
    tagged
}
