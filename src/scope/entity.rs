/// Explicit grant relation giving a non-owner access to one entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerRelation {
    pub table: &'static str,
    /// Column in the grant table referencing the entity id
    pub entity_column: &'static str,
    pub user_column: &'static str,
    pub organization_column: &'static str,
}

/// How a tenant-scoped table expresses ownership and peer access
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityScope {
    pub name: &'static str,
    pub table: &'static str,
    pub id_column: &'static str,
    pub organization_column: &'static str,
    pub owner_column: &'static str,
    pub peers: Option<PeerRelation>,
}

pub const PROJECTS: EntityScope = EntityScope {
    name: "project",
    table: "projects",
    id_column: "id",
    organization_column: "organization_id",
    owner_column: "user_id",
    peers: Some(PeerRelation {
        table: "project_members",
        entity_column: "project_id",
        user_column: "user_id",
        organization_column: "organization_id",
    }),
};

pub const TASKS: EntityScope = EntityScope {
    name: "task",
    table: "tasks",
    id_column: "id",
    organization_column: "organization_id",
    owner_column: "created_by",
    peers: Some(PeerRelation {
        table: "task_assignees",
        entity_column: "task_id",
        user_column: "user_id",
        organization_column: "organization_id",
    }),
};

pub const DOCUMENTS: EntityScope = EntityScope {
    name: "document",
    table: "documents",
    id_column: "id",
    organization_column: "organization_id",
    owner_column: "uploaded_by",
    peers: Some(PeerRelation {
        table: "document_shares",
        entity_column: "document_id",
        user_column: "user_id",
        organization_column: "organization_id",
    }),
};

pub const COMMENTS: EntityScope = EntityScope {
    name: "comment",
    table: "comments",
    id_column: "id",
    organization_column: "organization_id",
    owner_column: "user_id",
    peers: None,
};

pub const TENANT_ENTITIES: [EntityScope; 4] = [PROJECTS, TASKS, DOCUMENTS, COMMENTS];

/// Find an entity by singular name or table name
pub fn lookup(name: &str) -> Option<&'static EntityScope> {
    TENANT_ENTITIES.iter().find(|e| e.name == name || e.table == name)
}
