use rtype_types::EntityId;

/// Errors raised by registry operations. Per-entity occurrences of these are caught by
/// the systems pipeline and logged; they never unwind out of a system's `update`.
#[derive(Debug, thiserror::Error)]
pub enum EcsError {
    #[error("entity {0} not found in registry")]
    MissingEntity(EntityId),
    #[error("entity {0} has no component of the requested type")]
    MissingComponent(EntityId),
    #[error("component type cap ({0}) exceeded, cannot register a new component type")]
    ComponentCapExceeded(u32),
}
