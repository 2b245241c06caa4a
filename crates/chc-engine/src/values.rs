//! Small helpers shared by the engines.

use std::collections::BTreeMap;

use chc_core::ChcError;
use chc_logic::{get_model, TermContext, TermRef, Value};

/// Turns a model value into a constant term.
pub(crate) fn value_term(ctx: &mut TermContext, value: Value) -> TermRef {
    match value {
        Value::Int(v) => ctx.int_const(v),
        Value::Bool(true) => ctx.tru(),
        Value::Bool(false) => ctx.fls(),
    }
}

/// Binds every free variable of `constraint`: known values pass through,
/// the rest are solved for. Returns `None` when the grounded constraint is
/// unsatisfiable.
pub(crate) fn ground_assignment(
    ctx: &mut TermContext,
    constraint: TermRef,
    partial: &BTreeMap<TermRef, TermRef>,
) -> Result<Option<BTreeMap<TermRef, TermRef>>, ChcError> {
    let free = ctx.free_vars(constraint);
    let mut out: BTreeMap<TermRef, TermRef> = free
        .iter()
        .filter_map(|v| partial.get(v).map(|&c| (*v, c)))
        .collect();
    if out.len() == free.len() {
        let grounded = ctx.substitute(constraint, &out);
        return Ok(if ctx.is_true(grounded) { Some(out) } else { None });
    }
    let grounded = ctx.substitute(constraint, &out);
    let Some(model) = get_model(ctx, grounded)? else {
        return Ok(None);
    };
    for v in free {
        if out.contains_key(&v) {
            continue;
        }
        let value = model.get(&v).copied().unwrap_or(match ctx.sort_of(v) {
            chc_logic::Sort::Int => Value::Int(0),
            chc_logic::Sort::Bool => Value::Bool(false),
        });
        let constant = value_term(ctx, value);
        out.insert(v, constant);
    }
    Ok(Some(out))
}
