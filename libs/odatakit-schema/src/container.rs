use crate::config::EntityContainerConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntitySet {
    pub name: String,
    pub entity_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Singleton {
    pub name: String,
    pub type_name: String,
}

/// Entity sets and singletons exposed at the service root.
#[derive(Debug, Clone)]
pub struct EntityContainer {
    pub name: String,
    pub namespace: String,
    pub entity_sets: Vec<EntitySet>,
    pub singletons: Vec<Singleton>,
}

impl EntityContainer {
    #[must_use]
    pub fn from_config(config: &EntityContainerConfig, namespace: &str) -> Self {
        Self {
            name: config.name.clone(),
            namespace: namespace.to_owned(),
            entity_sets: config
                .entity_sets
                .iter()
                .map(|s| EntitySet {
                    name: s.name.clone(),
                    entity_type: s.entity_type.clone(),
                })
                .collect(),
            singletons: config
                .singletons
                .iter()
                .map(|s| Singleton {
                    name: s.name.clone(),
                    type_name: s.type_name.clone(),
                })
                .collect(),
        }
    }
}
