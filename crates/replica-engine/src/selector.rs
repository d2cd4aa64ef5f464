//! Strategy Selector
//!
//! Deterministic decision table choosing how a value is cloned.
//!
//! | # | condition | strategy |
//! |---|---|---|
//! | 1 | type carries a strategy directive | that strategy |
//! | 2 | type is immutable | identity |
//! | 3 | member count within the configured limit | structural |
//! | 4 | serializer fallback disabled | structural |
//! | 5 | otherwise | serializer |

use crate::classifier::TypeClassifier;
use crate::config::ClonerConfig;
use replica_model::{CloneStrategy, TypeDescriptor, Value};
use serde::Serialize;

/// How a value is cloned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Return the source unchanged
    Identity,
    /// Run the compiled clone procedure
    Structural,
    /// Round-trip through the structural serializer
    Serializer,
}

impl From<CloneStrategy> for Strategy {
    fn from(strategy: CloneStrategy) -> Self {
        match strategy {
            CloneStrategy::Structural => Self::Structural,
            CloneStrategy::Serializer => Self::Serializer,
        }
    }
}

/// Why a strategy was chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionReason {
    /// Declared by the type's strategy directive
    Directive,
    /// Type is immutable
    Immutable,
    /// Member count within the structural limit
    WithinMemberLimit,
    /// Above the limit but the fallback is disabled
    FallbackDisabled,
    /// Above the limit
    ExceedsMemberLimit,
    /// Scalar, text, or persistent value holding only immutable entries
    ImmutableValue,
    /// Array or container value, handled by its runtime shape
    CollectionValue,
}

/// Strategy decision with its reason
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Selection {
    /// Chosen strategy
    pub strategy: Strategy,
    /// Row of the decision table that matched
    pub reason: SelectionReason,
}

impl Selection {
    #[inline]
    fn new(strategy: Strategy, reason: SelectionReason) -> Self {
        Self { strategy, reason }
    }
}

/// Applies the decision table
#[derive(Debug, Clone, Copy)]
pub struct StrategySelector {
    max_members: usize,
    fallback: bool,
}

impl StrategySelector {
    /// Create selector from configuration
    #[must_use]
    pub fn new(config: &ClonerConfig) -> Self {
        Self {
            max_members: config.max_structural_members,
            fallback: config.serializer_fallback,
        }
    }

    /// Strategy for instances of a registered type
    #[must_use]
    pub fn select(&self, descriptor: &TypeDescriptor) -> Selection {
        if let Some(directive) = descriptor.strategy() {
            return Selection::new(directive.into(), SelectionReason::Directive);
        }
        if descriptor.is_immutable() {
            return Selection::new(Strategy::Identity, SelectionReason::Immutable);
        }
        if descriptor.member_count() <= self.max_members {
            return Selection::new(Strategy::Structural, SelectionReason::WithinMemberLimit);
        }
        if self.fallback {
            Selection::new(Strategy::Serializer, SelectionReason::ExceedsMemberLimit)
        } else {
            Selection::new(Strategy::Structural, SelectionReason::FallbackDisabled)
        }
    }

    /// Strategy for a top-level value
    #[must_use]
    pub fn select_value(&self, value: &Value) -> Selection {
        match value {
            Value::Object(object) => self.select(object.descriptor()),
            value if TypeClassifier::is_immutable_value(value) => {
                Selection::new(Strategy::Identity, SelectionReason::ImmutableValue)
            }
            _ => Selection::new(Strategy::Structural, SelectionReason::CollectionValue),
        }
    }
}

impl Default for StrategySelector {
    fn default() -> Self {
        Self::new(&ClonerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use replica_model::{ContainerRef, Persistent, TypeRef};

    fn wide(members: usize) -> TypeDescriptor {
        (0..members)
            .fold(TypeDescriptor::composite("Wide"), |builder, i| {
                builder.field(format!("f{i}"), TypeRef::int())
            })
            .build()
            .unwrap()
    }

    #[test]
    fn directive_wins() {
        let descriptor = TypeDescriptor::composite("Money")
            .read_only("amount", TypeRef::int())
            .strategy(CloneStrategy::Serializer)
            .build()
            .unwrap();
        let selection = StrategySelector::default().select(&descriptor);
        assert_eq!(selection.strategy, Strategy::Serializer);
        assert_eq!(selection.reason, SelectionReason::Directive);
    }

    #[test]
    fn immutable_is_identity() {
        let descriptor = TypeDescriptor::composite("Money")
            .read_only("amount", TypeRef::int())
            .build()
            .unwrap();
        assert_eq!(
            StrategySelector::default().select(&descriptor).strategy,
            Strategy::Identity
        );
    }

    #[test]
    fn member_limit_boundary() {
        let selector = StrategySelector::default();
        assert_eq!(selector.select(&wide(10)).strategy, Strategy::Structural);
        let above = selector.select(&wide(11));
        assert_eq!(above.strategy, Strategy::Serializer);
        assert_eq!(above.reason, SelectionReason::ExceedsMemberLimit);
    }

    #[test]
    fn fallback_disabled() {
        let selector =
            StrategySelector::new(&ClonerConfig::new().with_serializer_fallback(false));
        assert_eq!(
            selector.select(&wide(12)),
            Selection::new(Strategy::Structural, SelectionReason::FallbackDisabled)
        );
    }

    #[test]
    fn top_level_values() {
        let selector = StrategySelector::default();
        assert_eq!(
            selector.select_value(&Value::Int(3)).strategy,
            Strategy::Identity
        );
        assert_eq!(
            selector
                .select_value(&ContainerRef::list([Value::Int(1)]).into())
                .reason,
            SelectionReason::CollectionValue
        );

        let labels = Persistent::Set([Value::text("a")].into_iter().collect());
        assert_eq!(
            selector.select_value(&labels.into()),
            Selection::new(Strategy::Identity, SelectionReason::ImmutableValue)
        );
        let nested = Persistent::List([ContainerRef::list([Value::Int(1)]).into()].into_iter().collect());
        assert_eq!(
            selector.select_value(&nested.into()).strategy,
            Strategy::Structural
        );
    }

    #[test]
    fn selection_serializes() {
        let selection = Selection::new(Strategy::Structural, SelectionReason::WithinMemberLimit);
        let json = serde_json::to_string(&selection).unwrap();
        assert_eq!(
            json,
            r#"{"strategy":"structural","reason":"within_member_limit"}"#
        );
    }
}
