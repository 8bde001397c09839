//! Declaration template bodies
//!
//! Handlebars sources expanded against a [`NamingContext`](crate::naming::NamingContext).
//! Each method template is a complete inherent impl block holding exactly one
//! function, so that the rendered text parses on its own.

/// Import of one path
pub const IMPORT_TEMPLATE: &str = "use {{path}};";

/// Alias of the entity to the external model type
pub const ALIAS_TEMPLATE: &str = "pub type {{entity_type}} = {{models_module}}::{{entity_type}};";

/// Field-less service struct
pub const HOLDER_TEMPLATE: &str = "pub struct {{service_name}};";

/// `create` method
pub const CREATE_TEMPLATE: &str = r"impl {{service_name}} {
    pub fn create(&self, mut item: {{entity_type}}) -> Result<{{entity_type}}, dal::Error> {
        dal::query::<{{entity_type}}>()
            .preload(field::ASSOCIATIONS)
            .create(&mut item)?;
        Ok(item)
    }
}";

/// `get_all` method
pub const GET_ALL_TEMPLATE: &str = r"impl {{service_name}} {
    pub fn get_all(&self) -> Result<Vec<{{entity_type}}>, dal::Error> {
        let {{entity_plural}} = dal::query::<{{entity_type}}>()
            .preload(field::ASSOCIATIONS)
            .find()?;
        Ok({{entity_plural}})
    }
}";

/// `get_by_id` method
pub const GET_BY_ID_TEMPLATE: &str = r"impl {{service_name}} {
    pub fn get_by_id(&self, id: u64) -> Result<Option<{{entity_type}}>, dal::Error> {
        match dal::query::<{{entity_type}}>()
            .preload(field::ASSOCIATIONS)
            .filter(field::id().eq(id))
            .first()
        {
            Ok(item) => Ok(Some(item)),
            Err(dal::Error::RecordNotFound) => Ok(None),
            Err(err) => Err(err),
        }
    }
}";

/// `update` method
pub const UPDATE_TEMPLATE: &str = r"impl {{service_name}} {
    pub fn update(&self, mut item: {{entity_type}}) -> Result<{{entity_type}}, dal::Error> {
        dal::query::<{{entity_type}}>()
            .preload(field::ASSOCIATIONS)
            .save(&mut item)?;
        Ok(item)
    }
}";

/// `delete` method
pub const DELETE_TEMPLATE: &str = r"impl {{service_name}} {
    pub fn delete(&self, item: {{entity_type}}) -> Result<{{entity_type}}, dal::Error> {
        dal::query::<{{entity_type}}>()
            .unscoped()
            .preload(field::ASSOCIATIONS)
            .delete(&item)?;
        Ok(item)
    }
}";

/// `count` method
pub const COUNT_TEMPLATE: &str = r"impl {{service_name}} {
    pub fn count(&self) -> Result<i64, dal::Error> {
        dal::query::<{{entity_type}}>().count()
    }
}";

/// `sorted` method
pub const SORTED_TEMPLATE: &str = r"impl {{service_name}} {
    pub fn sorted(&self, column: &str, descending: bool) -> Result<Vec<{{entity_type}}>, dal::Error> {
        let order = if descending {
            field::column(column).desc()
        } else {
            field::column(column).asc()
        };
        let {{entity_plural}} = dal::query::<{{entity_type}}>()
            .preload(field::ASSOCIATIONS)
            .order(order)
            .find()?;
        Ok({{entity_plural}})
    }
}";

/// `search` method
pub const SEARCH_TEMPLATE: &str = r#"impl {{service_name}} {
    pub fn search(&self, column: &str, pattern: &str) -> Result<Vec<{{entity_type}}>, dal::Error> {
        let {{entity_plural}} = dal::query::<{{entity_type}}>()
            .preload(field::ASSOCIATIONS)
            .filter(field::column(column).like(format!("%{pattern}%")))
            .find()?;
        Ok({{entity_plural}})
    }
}"#;
