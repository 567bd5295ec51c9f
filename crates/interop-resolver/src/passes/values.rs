//! Value Pass - evaluate constants and enum members.
//!
//! Runs after linking, so cast targets can be followed through typedef chains.
//!
//! ## Algorithm
//!
//! 1. Seed the context with every value already known (evaluated constants
//!    and enum members) and mark every unevaluated one as pending
//! 2. Sweep constants in store order, then enum members in declaration order.
//!    An expression naming a pending identifier is deferred; any other failure
//!    settles the item as unrepresentable
//! 3. Repeat while a sweep makes progress, at most once per item that was
//!    unevaluated at the start
//! 4. Whatever is still pending is reported as unresolved
//!
//! An enum member without an initializer is the previous member plus one, or
//! zero when first. Members are visible to later expressions by name.
//!
//! Already evaluated items are never evaluated again.

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, trace};

use interop_core::{
    canonical, BuiltinType, CanonicalKind, DeclKey, Declaration, DefinedType, DiagnosticKind,
    Diagnostics, EvalError, EvaluatedValue, Literal, LiteralType, NativeEnum, NativeType,
};
use interop_store::DeclarationStore;

use crate::eval::{evaluate_str, CastTarget, EvalContext, Lookup};

/// Output of the value pass.
#[derive(Debug, Default)]
pub struct ValueOutput {
    /// Constants and enum members evaluated by this run.
    pub evaluated: usize,
    /// Items left without a value.
    pub unresolved: usize,
    /// Sweeps performed.
    pub passes: usize,
    pub diagnostics: Diagnostics,
}

/// Value Pass - resolves constant expressions and enum member values.
pub struct ValuePass<'s> {
    store: &'s mut DeclarationStore,
    max_passes: Option<usize>,
}

impl<'s> ValuePass<'s> {
    pub fn new(store: &'s mut DeclarationStore) -> Self {
        Self {
            store,
            max_passes: None,
        }
    }

    /// Cap the number of sweeps. The default is one per unevaluated item.
    pub fn with_max_passes(mut self, max_passes: Option<usize>) -> Self {
        self.max_passes = max_passes;
        self
    }

    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn run(self) -> ValueOutput {
        let mut output = ValueOutput::default();
        let mut ctx = ValueContext::new(cast_table(self.store));
        let mut failures: FxHashMap<String, EvalError> = FxHashMap::default();

        let tables = self.store.tables_mut();

        // seed
        for constant in tables.constants.iter() {
            match &constant.resolved {
                Some(v) => ctx.define(&constant.name, v.clone()),
                None => ctx.defer(&constant.name),
            }
        }
        let mut enum_roots: Vec<EnumRoot<'_>> = Vec::new();
        for typedef in tables.typedefs.iter_mut() {
            let key = typedef.key();
            enum_roots.push(EnumRoot::Typedef(key, &mut typedef.target));
        }
        for defined in tables.defined_types.iter_mut() {
            let key = defined.key();
            enum_roots.push(EnumRoot::Defined(key, defined));
        }
        for root in &mut enum_roots {
            root.for_each_enum(&mut |_, e| {
                for member in &e.members {
                    match &member.resolved {
                        Some(v) => ctx.define(&member.name, v.clone()),
                        None => ctx.defer(&member.name),
                    }
                }
            });
        }

        let outstanding = ctx.pending.len();
        if outstanding == 0 {
            return output;
        }
        let limit = self.max_passes.unwrap_or(outstanding).max(1);

        // sweep
        while output.passes < limit {
            output.passes += 1;
            let before = output.evaluated;

            for constant in tables.constants.iter_mut() {
                if constant.resolved.is_some() || failures.contains_key(&constant.name) {
                    continue;
                }
                match evaluate_str(&constant.value, &ctx) {
                    Ok(value) => {
                        trace!(name = %constant.name, %value, "evaluated constant");
                        ctx.define(&constant.name, value.clone());
                        constant.resolved = Some(value);
                        output.evaluated += 1;
                    }
                    Err(e) if e.is_pending() => {}
                    Err(e) => {
                        failures.insert(constant.name.clone(), e);
                    }
                }
            }

            for root in &mut enum_roots {
                root.for_each_enum(&mut |key, e| {
                    evaluate_enum(e, key, &mut ctx, &mut failures, &mut output.evaluated);
                });
            }

            if output.evaluated == before {
                break;
            }
        }

        // report
        for constant in tables.constants.iter() {
            if constant.resolved.is_none() {
                output.unresolved += 1;
                let failure = failures.get(&constant.name);
                report(&mut output.diagnostics, &constant.key(), &constant.name, failure);
            }
        }
        for root in &mut enum_roots {
            root.for_each_enum(&mut |key, e| {
                for member in e.members.iter().filter(|m| m.resolved.is_none()) {
                    output.unresolved += 1;
                    let failure = failures.get(&member.name);
                    report(&mut output.diagnostics, key, &member.name, failure);
                }
            });
        }

        debug!(
            evaluated = output.evaluated,
            unresolved = output.unresolved,
            passes = output.passes,
            "value pass complete"
        );
        output
    }
}

fn report(
    diagnostics: &mut Diagnostics,
    subject: &DeclKey,
    name: &str,
    failure: Option<&EvalError>,
) {
    match failure {
        Some(EvalError::EmptyExpression) => diagnostics.report(
            DiagnosticKind::UnresolvedConstant,
            Some(subject.clone()),
            format!("'{name}' has no value"),
        ),
        Some(e) => diagnostics.report(
            DiagnosticKind::UnrepresentableExpression,
            Some(subject.clone()),
            format!("'{name}' cannot be represented: {e}"),
        ),
        None => diagnostics.report(
            DiagnosticKind::UnresolvedConstant,
            Some(subject.clone()),
            format!("'{name}' depends on values that never resolved"),
        ),
    }
}

fn evaluate_enum(
    e: &mut NativeEnum,
    key: &DeclKey,
    ctx: &mut ValueContext,
    failures: &mut FxHashMap<String, EvalError>,
    evaluated: &mut usize,
) {
    // value of the previous member: `Some(None)` while it is still unknown
    let mut previous: Option<Option<EvaluatedValue>> = None;

    for member in &mut e.members {
        if let Some(v) = &member.resolved {
            previous = Some(Some(v.clone()));
            continue;
        }
        if failures.contains_key(&member.name) {
            previous = Some(None);
            continue;
        }

        let result = match (&member.value, &previous) {
            (Some(expr), _) => evaluate_str(expr, &*ctx),
            (None, None) => Ok(EvaluatedValue::new(Literal::Int(0), LiteralType::Int32)),
            (None, Some(Some(prev))) => successor(prev),
            (None, Some(None)) => Err(EvalError::PendingIdentifier {
                name: member.name.clone(),
            }),
        };

        match result {
            Ok(value) => {
                trace!(subject = %key, member = %member.name, %value, "evaluated enum member");
                ctx.define(&member.name, value.clone());
                previous = Some(Some(value.clone()));
                member.resolved = Some(value);
                *evaluated += 1;
            }
            Err(err) => {
                if !err.is_pending() {
                    failures.insert(member.name.clone(), err);
                }
                previous = Some(None);
            }
        }
    }
}

fn successor(previous: &EvaluatedValue) -> Result<EvaluatedValue, EvalError> {
    let next = previous
        .as_i128()
        .ok_or_else(|| EvalError::UnsupportedOperator {
            token: format!("implicit successor of {previous}"),
        })?
        + 1;
    EvaluatedValue::integer_as(next, previous.ty)
        .or_else(|| EvaluatedValue::integer(next))
        .ok_or(EvalError::OutOfRange)
}

// ============================================================================
// Enum locations
// ============================================================================

/// A declaration that may carry enums, with its identity for diagnostics.
enum EnumRoot<'a> {
    Typedef(DeclKey, &'a mut NativeType),
    Defined(DeclKey, &'a mut DefinedType),
}

impl EnumRoot<'_> {
    fn for_each_enum(&mut self, f: &mut dyn FnMut(&DeclKey, &mut NativeEnum)) {
        match self {
            EnumRoot::Typedef(key, ty) => ty.for_each_enum_mut(&mut |e| f(&*key, e)),
            EnumRoot::Defined(key, defined) => defined.for_each_enum_mut(&mut |e| f(&*key, e)),
        }
    }
}

// ============================================================================
// Context
// ============================================================================

struct ValueContext {
    values: FxHashMap<String, EvaluatedValue>,
    pending: FxHashSet<String>,
    casts: FxHashMap<String, CastTarget>,
}

impl ValueContext {
    fn new(casts: FxHashMap<String, CastTarget>) -> Self {
        Self {
            values: FxHashMap::default(),
            pending: FxHashSet::default(),
            casts,
        }
    }

    fn define(&mut self, name: &str, value: EvaluatedValue) {
        self.pending.remove(name);
        self.values.insert(name.to_string(), value);
    }

    fn defer(&mut self, name: &str) {
        if !self.values.contains_key(name) {
            self.pending.insert(name.to_string());
        }
    }
}

impl EvalContext for ValueContext {
    fn lookup_value(&self, name: &str) -> Lookup {
        if let Some(v) = self.values.get(name) {
            Lookup::Found(v.clone())
        } else if self.pending.contains(name) {
            Lookup::Pending
        } else {
            Lookup::Unknown
        }
    }

    fn cast_target(&self, name: &str) -> CastTarget {
        match self.casts.get(name) {
            Some(target) => *target,
            None => BuiltinType::from_c_name(name)
                .map(CastTarget::from_builtin)
                .unwrap_or(CastTarget::NotAType),
        }
    }
}

/// What every typedef and defined type name means as a cast target.
fn cast_table(store: &DeclarationStore) -> FxHashMap<String, CastTarget> {
    let mut casts = FxHashMap::default();
    for typedef in store.typedefs() {
        let target = match canonical(&typedef.target, store).kind {
            CanonicalKind::Builtin(b) => CastTarget::from_builtin(b),
            CanonicalKind::Defined(DefinedType::Enum(_)) => CastTarget::Integer(LiteralType::Int32),
            CanonicalKind::Type(NativeType::Enum(_)) => {
                CastTarget::Integer(LiteralType::Int32)
            }
            _ => CastTarget::Opaque,
        };
        casts.insert(typedef.name.clone(), target);
    }
    for defined in store.defined_types() {
        let target = match defined {
            DefinedType::Enum(_) => CastTarget::Integer(LiteralType::Int32),
            _ => CastTarget::Opaque,
        };
        casts.insert(defined.name().to_string(), target);
    }
    casts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passes::LinkingPass;
    use interop_core::{BuiltinKind, EnumMember, NativeConstant, NativeTypeDef};

    fn int(value: i128) -> EvaluatedValue {
        EvaluatedValue::integer(value).unwrap()
    }

    fn resolved(store: &DeclarationStore, name: &str) -> Option<EvaluatedValue> {
        store.find_constant(name).and_then(|c| c.resolved.clone())
    }

    #[test]
    fn forward_dependencies_resolve() {
        let mut store = DeclarationStore::new();
        store.add_constant(NativeConstant::from_macro("WM_USER_PLUS", "WM_USER + 1"));
        store.add_constant(NativeConstant::from_macro("WM_USER", "0x0400"));
        store.add_constant(NativeConstant::from_macro("WM_PAINT", "0x000F"));
        store.commit();

        let output = ValuePass::new(&mut store).run();
        assert_eq!(output.evaluated, 3);
        assert_eq!(output.unresolved, 0);
        assert!(output.diagnostics.is_empty());
        assert_eq!(resolved(&store, "WM_USER_PLUS"), Some(int(0x401)));
        assert_eq!(resolved(&store, "WM_PAINT"), Some(int(0xF)));
    }

    #[test]
    fn chained_forward_references_need_several_sweeps() {
        let mut store = DeclarationStore::new();
        store.add_constant(NativeConstant::new("A", "B + 1"));
        store.add_constant(NativeConstant::new("B", "C + 1"));
        store.add_constant(NativeConstant::new("C", "1"));
        store.commit();

        let output = ValuePass::new(&mut store).run();
        assert_eq!(resolved(&store, "A"), Some(int(3)));
        assert!(output.passes >= 2);
        assert!(output.passes <= 3);
    }

    #[test]
    fn sweep_limit_is_honored() {
        let mut store = DeclarationStore::new();
        store.add_constant(NativeConstant::new("A", "B + 1"));
        store.add_constant(NativeConstant::new("B", "C + 1"));
        store.add_constant(NativeConstant::new("C", "1"));
        store.commit();

        let output = ValuePass::new(&mut store).with_max_passes(Some(1)).run();
        assert_eq!(output.passes, 1);
        assert_eq!(resolved(&store, "C"), Some(int(1)));
        assert_eq!(resolved(&store, "A"), None);
        assert_eq!(
            output.diagnostics.of_kind(DiagnosticKind::UnresolvedConstant).count(),
            2
        );
    }

    #[test]
    fn cycles_and_failures_are_reported() {
        let mut store = DeclarationStore::new();
        store.add_constant(NativeConstant::new("LOOP_A", "LOOP_B"));
        store.add_constant(NativeConstant::new("LOOP_B", "LOOP_A"));
        store.add_constant(NativeConstant::new("UNKNOWN", "NOT_DEFINED + 1"));
        store.add_constant(NativeConstant::from_macro("EMPTY", "   "));
        store.add_constant(NativeConstant::new("DEPENDS", "UNKNOWN * 2"));
        store.commit();

        let output = ValuePass::new(&mut store).run();
        assert_eq!(output.evaluated, 0);
        assert_eq!(output.unresolved, 5);

        let unrepresentable: Vec<_> = output
            .diagnostics
            .of_kind(DiagnosticKind::UnrepresentableExpression)
            .collect();
        assert_eq!(unrepresentable.len(), 1);
        assert_eq!(unrepresentable[0].subject, Some(DeclKey::constant("UNKNOWN")));
        assert_eq!(
            output.diagnostics.of_kind(DiagnosticKind::UnresolvedConstant).count(),
            4
        );
        assert!(!output.diagnostics.has_errors());
    }

    #[test]
    fn enum_members_count_up_and_are_visible() {
        let mut store = DeclarationStore::new();
        store.add_defined_type(DefinedType::Enum(
            NativeEnum::new("Color")
                .with_member(EnumMember::new("Red"))
                .with_member(EnumMember::new("Green"))
                .with_member(EnumMember::with_value("Blue", "10"))
                .with_member(EnumMember::new("Next"))
                .with_member(EnumMember::with_value("Alias", "Green | LATE")),
        ));
        store.add_constant(NativeConstant::new("LATE", "0x100"));
        store.add_constant(NativeConstant::new("BLUE_TOO", "Blue"));
        store.commit();

        let output = ValuePass::new(&mut store).run();
        assert_eq!(output.unresolved, 0, "{}", output.diagnostics);

        let color = store.find_defined_type("Color").unwrap().as_enum().unwrap();
        let values: Vec<_> = color
            .members
            .iter()
            .map(|m| m.resolved.as_ref().and_then(EvaluatedValue::as_i128))
            .collect();
        assert_eq!(values, [Some(0), Some(1), Some(10), Some(11), Some(0x101)]);
        assert_eq!(resolved(&store, "BLUE_TOO"), Some(int(10)));
    }

    #[test]
    fn casts_follow_typedef_chains() {
        let mut store = DeclarationStore::new();
        store.add_typedef(NativeTypeDef::new("ULONG", NativeType::unsigned(BuiltinKind::Int32)));
        store.add_typedef(NativeTypeDef::new("DWORD", NativeType::named("ULONG")));
        store.add_typedef(NativeTypeDef::new("HANDLE", NativeType::pointer(NativeType::void())));
        store.add_constant(NativeConstant::from_macro("INFINITE", "((DWORD)-1)"));
        store.add_constant(NativeConstant::from_macro("INVALID_HANDLE_VALUE", "((HANDLE)(LONG_PTR)-1)"));
        store.commit();

        LinkingPass::new(&mut store).run();
        let output = ValuePass::new(&mut store).run();

        assert_eq!(
            resolved(&store, "INFINITE"),
            EvaluatedValue::integer_as(0xFFFF_FFFF, LiteralType::UInt32)
        );
        assert_eq!(resolved(&store, "INVALID_HANDLE_VALUE"), None);
        assert_eq!(output.unresolved, 1);
    }

    #[test]
    fn rerun_evaluates_nothing_new() {
        let mut store = DeclarationStore::new();
        store.add_constant(NativeConstant::new("A", "1 << 3"));
        store.add_constant(NativeConstant::new("BAD", "1 / 0"));
        store.commit();

        let first = ValuePass::new(&mut store).run();
        let snapshot = store.clone();
        let second = ValuePass::new(&mut store).run();

        assert_eq!(first.evaluated, 1);
        assert_eq!(second.evaluated, 0);
        // BAD is still unvalued, so it is reported again
        assert_eq!(first.diagnostics, second.diagnostics);
        assert_eq!(store.constants(), snapshot.constants());
    }
}
