//! Hot-swap adapter - carries state instances across type versions
//!
//! Compatibility between two shapes is decided once per (source, target, rule)
//! and cached as an [`AdaptationPlan`]. Adapting an instance then only replays
//! the plan. Soft casts never fail with an error: the outcome says whether the
//! adapted value or the caller's default came back.

use std::any::{type_name, Any};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use log::debug;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use super::filter::FilterByType;
use super::shape::{Conversion, Member, Shape, ShapeKey};
use super::value::{DynObject, HotSwapState, NodeData};
use crate::error::CastError;

/// How target members find their source member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchRule {
    /// Members match by name only
    ByName,
    /// Members match by name; a target member with no namesake takes the source
    /// member at the same position if that member is not claimed by name
    ByNameThenPosition,
}

#[derive(Debug, Clone, PartialEq)]
enum Step {
    Take { source: usize, conversion: Conversion },
    Default(NodeData),
}

/// Precomputed recipe turning instances of one shape into another
#[derive(Debug, Clone, PartialEq)]
pub struct AdaptationPlan {
    steps: Vec<Step>,
}

impl AdaptationPlan {
    /// Build the plan, or `None` if a required target member cannot be satisfied
    pub fn compute(source: &Shape, target: &Shape, rule: MatchRule) -> Option<Self> {
        let steps = target
            .members
            .iter()
            .enumerate()
            .map(|(position, member)| Self::step_for(source, target, rule, position, member))
            .collect::<Option<Vec<_>>>()?;
        Some(Self { steps })
    }

    fn step_for(
        source: &Shape,
        target: &Shape,
        rule: MatchRule,
        position: usize,
        member: &Member,
    ) -> Option<Step> {
        let fallback = || member.default.clone().map(Step::Default);

        if let Some(index) = source.index_of(&member.name) {
            return match source.members[index].data_type.assignment_to(&member.data_type) {
                Some(conversion) => Some(Step::Take {
                    source: index,
                    conversion,
                }),
                // Retyped member
                None => fallback(),
            };
        }

        if rule == MatchRule::ByNameThenPosition {
            let positional = source
                .members
                .get(position)
                .filter(|candidate| target.member(&candidate.name).is_none())
                .and_then(|candidate| candidate.data_type.assignment_to(&member.data_type));
            if let Some(conversion) = positional {
                return Some(Step::Take {
                    source: position,
                    conversion,
                });
            }
        }

        fallback()
    }

    /// Members carried over from the source
    pub fn copied(&self) -> usize {
        self.steps
            .iter()
            .filter(|step| matches!(step, Step::Take { .. }))
            .count()
    }

    /// Members filled from target defaults
    pub fn defaulted(&self) -> usize {
        self.steps.len() - self.copied()
    }

    fn apply(&self, input: &DynObject, target: &Arc<Shape>) -> DynObject {
        let values = self
            .steps
            .iter()
            .map(|step| match step {
                Step::Take { source, conversion } => input
                    .values()
                    .get(*source)
                    .map_or(NodeData::None, |value| value.convert(*conversion)),
                Step::Default(value) => value.clone(),
            })
            .collect();
        DynObject::from_parts(Arc::clone(target), values)
    }
}

/// Result of a soft cast
#[derive(Debug, Clone, PartialEq)]
pub enum CastOutcome<T> {
    /// The input satisfied the target shape
    Adapted(T),
    /// The input could not be adapted; carries the caller's default
    Fallback(T),
}

impl<T> CastOutcome<T> {
    pub fn success(&self) -> bool {
        matches!(self, CastOutcome::Adapted(_))
    }

    pub fn value(&self) -> &T {
        match self {
            CastOutcome::Adapted(value) | CastOutcome::Fallback(value) => value,
        }
    }

    pub fn into_inner(self) -> T {
        match self {
            CastOutcome::Adapted(value) | CastOutcome::Fallback(value) => value,
        }
    }

    /// The value and the success flag
    pub fn into_parts(self) -> (T, bool) {
        let success = self.success();
        (self.into_inner(), success)
    }
}

/// Adapter options, part of the session configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterOptions {
    /// Cache one plan per shape pair. Disabling recomputes on every cast.
    pub cache_plans: bool,
}

impl Default for AdapterOptions {
    fn default() -> Self {
        Self { cache_plans: true }
    }
}

type PlanKey = (ShapeKey, ShapeKey, MatchRule);

/// Performs hard and soft casts of state instances across shape versions
#[derive(Debug, Default)]
pub struct HotSwapAdapter {
    options: AdapterOptions,
    plans: RwLock<HashMap<PlanKey, Option<Arc<AdaptationPlan>>>>,
}

static GLOBAL_ADAPTER: Lazy<HotSwapAdapter> = Lazy::new(HotSwapAdapter::default);

impl HotSwapAdapter {
    pub fn new(options: AdapterOptions) -> Self {
        Self {
            options,
            plans: RwLock::new(HashMap::new()),
        }
    }

    /// The process-wide adapter
    pub fn global() -> &'static HotSwapAdapter {
        &GLOBAL_ADAPTER
    }

    /// The plan adapting `source` to `target`, `None` if incompatible
    pub fn plan(&self, source: &Shape, target: &Shape, rule: MatchRule) -> Option<Arc<AdaptationPlan>> {
        if !self.options.cache_plans {
            return AdaptationPlan::compute(source, target, rule).map(Arc::new);
        }

        let key = (source.key(), target.key(), rule);
        if let Some(plan) = self
            .plans
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return plan.clone();
        }

        let plan = AdaptationPlan::compute(source, target, rule).map(Arc::new);
        match &plan {
            Some(plan) => debug!(
                "Adaptation plan {} -> {}: {} copied, {} defaulted",
                source,
                target,
                plan.copied(),
                plan.defaulted()
            ),
            None => debug!("No adaptation from {} to {}", source, target),
        }
        self.plans
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, plan.clone());
        plan
    }

    /// Number of cached shape pairs
    pub fn plan_cache_len(&self) -> usize {
        self.plans.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn clear_cache(&self) {
        self.plans.write().unwrap_or_else(PoisonError::into_inner).clear();
    }

    fn adapt(&self, input: &DynObject, target: &Arc<Shape>, rule: MatchRule) -> Option<DynObject> {
        if Arc::ptr_eq(input.shape(), target) {
            return Some(input.clone());
        }
        self.plan(input.shape(), target, rule)
            .map(|plan| plan.apply(input, target))
    }

    /// Structurally adapt an instance to `target`, matching members by name
    pub fn adapt_object(&self, input: &DynObject, target: &Arc<Shape>) -> Option<DynObject> {
        self.adapt(input, target, MatchRule::ByName)
    }

    /// Like [`adapt_object`](Self::adapt_object) with the positional fallback
    /// used for generic element types
    pub fn adapt_object_generic(&self, input: &DynObject, target: &Arc<Shape>) -> Option<DynObject> {
        self.adapt(input, target, MatchRule::ByNameThenPosition)
    }

    /// Reinterpret a type-erased value as `T`
    pub fn hard_cast<T: Any>(&self, input: Box<dyn Any>) -> Result<T, CastError> {
        input.downcast::<T>().map(|value| *value).map_err(|other| CastError::HardCastMismatch {
            expected: type_name::<T>().to_string(),
            found: format!("{:?}", (*other).type_id()),
        })
    }

    /// Relabel an instance with `target`, which must have the identical layout
    pub fn hard_cast_object(&self, input: DynObject, target: &Arc<Shape>) -> Result<DynObject, CastError> {
        if !input.shape().same_layout(target) {
            return Err(CastError::HardCastMismatch {
                expected: target.to_string(),
                found: input.shape().to_string(),
            });
        }
        Ok(DynObject::from_parts(Arc::clone(target), input.into_values()))
    }

    /// Hard cast straight into a Rust state type
    pub fn hard_cast_state<T: HotSwapState>(&self, input: DynObject) -> Result<T, CastError> {
        let target = T::shape();
        let object = self.hard_cast_object(input, &target)?;
        T::from_object(&object).ok_or_else(|| CastError::HardCastMismatch {
            expected: type_name::<T>().to_string(),
            found: object.shape().to_string(),
        })
    }

    /// Soft cast: adapt `input` to `T`, or hand back `default`
    pub fn cast_as<T: HotSwapState>(&self, input: &DynObject, default: T) -> CastOutcome<T> {
        match self
            .adapt(input, &T::shape(), MatchRule::ByName)
            .and_then(|object| T::from_object(&object))
        {
            Some(value) => CastOutcome::Adapted(value),
            None => CastOutcome::Fallback(default),
        }
    }

    /// Soft cast with continuation callbacks for the two outcomes
    pub fn cast_as_with<T, R>(
        &self,
        input: &DynObject,
        default: T,
        on_result_found: impl FnOnce(T) -> R,
        on_failure: impl FnOnce(T) -> R,
    ) -> R
    where
        T: HotSwapState,
    {
        match self.cast_as(input, default) {
            CastOutcome::Adapted(value) => on_result_found(value),
            CastOutcome::Fallback(value) => on_failure(value),
        }
    }

    /// Soft cast between two state types whose element layout may have changed
    /// arity; members match by name, then by position
    pub fn cast_as_generic<TIn, TOut>(&self, input: &TIn, default: TOut) -> CastOutcome<TOut>
    where
        TIn: HotSwapState,
        TOut: HotSwapState,
    {
        match self
            .adapt(&input.to_object(), &TOut::shape(), MatchRule::ByNameThenPosition)
            .and_then(|object| TOut::from_object(&object))
        {
            Some(value) => CastOutcome::Adapted(value),
            None => CastOutcome::Fallback(default),
        }
    }

    /// Lazily select the items adaptable to `T`, in their original order
    pub fn filter_by_type<'a, T: HotSwapState>(&'a self, items: &'a [NodeData]) -> FilterByType<'a, T> {
        FilterByType::new(self, items)
    }

    /// Soft cast of a single value; non-object values never adapt
    pub(crate) fn try_cast<T: HotSwapState>(&self, item: &NodeData) -> Option<T> {
        let object = item.as_object()?;
        self.adapt(object, &T::shape(), MatchRule::ByName)
            .and_then(|adapted| T::from_object(&adapted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hotswap::shape::DataType;

    fn shape_v1() -> Shape {
        Shape::new("Light", 1)
            .with_member(Member::required("intensity", DataType::Int))
            .with_member(Member::required("name", DataType::String))
            .with_member(Member::required("legacy", DataType::Boolean))
    }

    fn shape_v2() -> Shape {
        Shape::new("Light", 2)
            .with_member(Member::required("intensity", DataType::Float))
            .with_member(Member::required("name", DataType::String))
            .with_member(Member::optional("radius", DataType::Float, NodeData::Float(1.0)))
    }

    #[test]
    fn test_plan_copies_shared_and_defaults_new_members() {
        let plan = AdaptationPlan::compute(&shape_v1(), &shape_v2(), MatchRule::ByName).unwrap();
        assert_eq!(plan.copied(), 2);
        assert_eq!(plan.defaulted(), 1);
    }

    #[test]
    fn test_plan_fails_on_missing_required_member() {
        let target = shape_v2().with_member(Member::required("shadow", DataType::Boolean));
        assert!(AdaptationPlan::compute(&shape_v1(), &target, MatchRule::ByName).is_none());
    }

    #[test]
    fn test_retyped_member_falls_back_to_default() {
        let target = Shape::new("Light", 3).with_member(Member::optional(
            "name",
            DataType::Float,
            NodeData::Float(0.0),
        ));
        let plan = AdaptationPlan::compute(&shape_v1(), &target, MatchRule::ByName).unwrap();
        assert_eq!(plan.defaulted(), 1);

        let strict = Shape::new("Light", 4).with_member(Member::required("name", DataType::Float));
        assert!(AdaptationPlan::compute(&shape_v1(), &strict, MatchRule::ByName).is_none());
    }

    #[test]
    fn test_positional_rule_only_uses_unclaimed_members() {
        let source = Shape::new("Pair", 1)
            .with_member(Member::required("Item1", DataType::Float))
            .with_member(Member::required("Item2", DataType::String));
        let target = Shape::new("Pair", 2)
            .with_member(Member::required("first", DataType::Float))
            .with_member(Member::required("Item2", DataType::String))
            .with_member(Member::optional("third", DataType::Int, NodeData::Int(0)));

        assert!(AdaptationPlan::compute(&source, &target, MatchRule::ByName).is_none());
        let plan = AdaptationPlan::compute(&source, &target, MatchRule::ByNameThenPosition).unwrap();
        assert_eq!(plan.copied(), 2);
        assert_eq!(plan.defaulted(), 1);
    }

    #[test]
    fn test_plans_are_cached_per_shape_pair() {
        let adapter = HotSwapAdapter::new(AdapterOptions::default());
        let source = Arc::new(shape_v1());
        let target = Arc::new(shape_v2());

        let object = DynObject::new(Arc::clone(&source))
            .with("intensity", NodeData::Int(4))
            .with("name", NodeData::String("key".into()));
        let adapted = adapter.adapt_object(&object, &target).unwrap();
        adapter.adapt_object(&object, &target).unwrap();

        assert_eq!(adapter.plan_cache_len(), 1);
        assert_eq!(adapted.get("intensity"), Some(&NodeData::Float(4.0)));
        assert_eq!(adapted.get("radius"), Some(&NodeData::Float(1.0)));
        assert_eq!(adapted.get("legacy"), None);

        adapter.clear_cache();
        assert_eq!(adapter.plan_cache_len(), 0);
    }

    #[test]
    fn test_cached_plan_tracks_default_and_requiredness_edits() {
        let adapter = HotSwapAdapter::new(AdapterOptions::default());
        let source = Arc::new(Shape::new("Light", 1).with_member(Member::required("name", DataType::String)));
        let object = DynObject::new(source).with("name", NodeData::String("key".into()));
        let target = |radius: Member| Arc::new(Shape::new("Light", 2).with_member(radius));

        let first = target(Member::optional("radius", DataType::Float, NodeData::Float(1.0)));
        let adapted = adapter.adapt_object(&object, &first).unwrap();
        assert_eq!(adapted.get("radius"), Some(&NodeData::Float(1.0)));

        // Same name and version, recompiled with a new default
        let redefaulted = target(Member::optional("radius", DataType::Float, NodeData::Float(2.0)));
        let adapted = adapter.adapt_object(&object, &redefaulted).unwrap();
        assert_eq!(adapted.get("radius"), Some(&NodeData::Float(2.0)));

        // Recompiled again with the member made required
        let required = target(Member::required("radius", DataType::Float));
        assert!(adapter.adapt_object(&object, &required).is_none());
        assert_eq!(adapter.plan_cache_len(), 3);
    }

    #[test]
    fn test_uncached_adapter_keeps_no_plans() {
        let adapter = HotSwapAdapter::new(AdapterOptions { cache_plans: false });
        assert!(adapter.plan(&shape_v1(), &shape_v2(), MatchRule::ByName).is_some());
        assert_eq!(adapter.plan_cache_len(), 0);
    }

    #[test]
    fn test_hard_cast_any() {
        let adapter = HotSwapAdapter::default();
        let value: Box<dyn Any> = Box::new(12_u32);
        assert_eq!(adapter.hard_cast::<u32>(value), Ok(12));

        let value: Box<dyn Any> = Box::new("text");
        let err = adapter.hard_cast::<u32>(value).unwrap_err();
        assert!(matches!(err, CastError::HardCastMismatch { .. }));
    }

    #[test]
    fn test_hard_cast_object_requires_identical_layout() {
        let adapter = HotSwapAdapter::default();
        let source = Arc::new(shape_v1());
        let mut recompiled = shape_v1();
        recompiled.version = 9;
        let recompiled = Arc::new(recompiled);

        let object = DynObject::new(Arc::clone(&source)).with("intensity", NodeData::Int(2));
        let cast = adapter.hard_cast_object(object.clone(), &recompiled).unwrap();
        assert_eq!(cast.shape().version, 9);
        assert_eq!(cast.get("intensity"), Some(&NodeData::Int(2)));

        let err = adapter.hard_cast_object(object, &Arc::new(shape_v2())).unwrap_err();
        assert!(matches!(err, CastError::HardCastMismatch { .. }));
    }
}
