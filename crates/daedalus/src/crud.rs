//! Generic CRUD controller template.
//!
//! One controller implementation, many bound instances: the template
//! class declares its routes against the symbolic entity type `T` and
//! id type `TID`, and [`bind_entity`] synthesizes a concrete subclass
//! per entity. Reflection of the synthesized class resolves the
//! symbols, so binding, validation and routing all see concrete
//! types. Instances are backed by a [`Repository`] and registered in
//! the resolver per bound class.

use std::sync::Arc;

use serde_json::Value;

use daedalus_core::{
    action, ActionContext, ActionResult, DaedalusError, DaedalusResult, FindOptions, Repository,
};
use daedalus_reflect::decorate::{generic, route, val};
use daedalus_reflect::{class, number, symbol, ClassId, ReflectResult, TypeSpace};

/// Default page size for unpaged list requests.
const DEFAULT_LIMIT: u64 = 25;

/// Repository-backed controller behind every bound CRUD class.
pub struct CrudController {
    repo: Arc<dyn Repository>,
}

impl CrudController {
    /// Creates a controller over a repository.
    #[must_use]
    pub fn new(repo: Arc<dyn Repository>) -> Self {
        Self { repo }
    }
}

fn controller_of(ctx: &ActionContext) -> DaedalusResult<Arc<CrudController>> {
    ctx.instance::<CrudController>().ok_or_else(|| {
        DaedalusError::configuration("CRUD route resolved to a non-CRUD controller instance")
    })
}

fn as_count(value: &Value, default: u64) -> usize {
    usize::try_from(value.as_u64().unwrap_or(default)).unwrap_or(usize::MAX)
}

async fn list(ctx: ActionContext) -> DaedalusResult<ActionResult> {
    let controller = controller_of(&ctx)?;
    let offset = as_count(ctx.arg(0), 0);
    let limit = as_count(ctx.arg(1), DEFAULT_LIMIT);
    let rows = controller
        .repo
        .find(offset, limit, FindOptions::default())
        .await?;
    Ok(ActionResult::from_body(Value::Array(rows)))
}

async fn get(ctx: ActionContext) -> DaedalusResult<ActionResult> {
    let controller = controller_of(&ctx)?;
    match controller.repo.get(ctx.arg(0)).await? {
        Some(row) => Ok(ActionResult::from_body(row)),
        None => Err(DaedalusError::not_found("no entity with the given id")),
    }
}

async fn save(ctx: ActionContext) -> DaedalusResult<ActionResult> {
    let controller = controller_of(&ctx)?;
    let saved = controller.repo.save(ctx.arg(0).clone()).await?;
    Ok(ActionResult::from_body(saved))
}

async fn remove(ctx: ActionContext) -> DaedalusResult<ActionResult> {
    let controller = controller_of(&ctx)?;
    if controller.repo.delete(ctx.arg(0)).await? {
        Ok(ActionResult::new())
    } else {
        Err(DaedalusError::not_found("no entity with the given id"))
    }
}

/// Registers the generic CRUD template class.
///
/// The template itself is never routed or reflected directly; bind it
/// to an entity with [`bind_entity`] first.
///
/// # Errors
///
/// Registration errors (duplicate name).
pub fn define_template(space: &TypeSpace) -> ReflectResult<ClassId> {
    space
        .define("CrudController")
        .decorate(generic::template(["T", "TID"]))
        .method("list", |m| {
            m.param("offset", number())
                .param("limit", number())
                .decorate(route::get(Some("")))
                .decorate_param(0, val::optional())
                .decorate_param(1, val::optional())
                .handler(action(list))
        })
        .method("get", |m| {
            m.param("id", symbol("TID"))
                .decorate(route::get(Some(":id")))
                .decorate_param(0, val::required())
                .handler(action(get))
        })
        .method("save", |m| {
            m.param("model", symbol("T"))
                .decorate(route::post(Some("")))
                .decorate(route::put(Some("")))
                .decorate_param(0, val::required())
                .handler(action(save))
        })
        .method("remove", |m| {
            m.param("id", symbol("TID"))
                .decorate(route::delete(Some(":id")))
                .decorate_param(0, val::required())
                .handler(action(remove))
        })
        .register()
}

/// Synthesizes a CRUD controller bound to an entity class and its id
/// type. The returned class routes under the stripped controller
/// name, e.g. `AnimalController` serves `/animal`.
///
/// # Errors
///
/// Synthesis errors: unknown template, duplicate controller name,
/// arity mismatch.
pub fn bind_entity(
    space: &TypeSpace,
    template: ClassId,
    controller_name: &str,
    entity: ClassId,
    id_type: daedalus_reflect::DataType,
) -> ReflectResult<ClassId> {
    space.synthesize(template, controller_name, vec![class(entity), id_type])
}
