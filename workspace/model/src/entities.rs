//! Root of all SeaORM entity modules.
//! Every collection of the construction dashboard is defined here: projects
//! and the budget items, expenses, invoices, tasks, stock and purchase orders
//! that hang off them, plus the shared material catalog, users and settings.

pub mod budget_item;
pub mod expense;
pub mod invoice;
pub mod material;
pub mod material_request;
pub mod project;
pub mod project_material;
pub mod purchase_order;
pub mod setting;
pub mod task;
pub mod user;

pub mod prelude {
    //! A prelude module for easy importing of all entities.
    pub use super::budget_item::Entity as BudgetItem;
    pub use super::expense::Entity as Expense;
    pub use super::invoice::Entity as Invoice;
    pub use super::material::Entity as Material;
    pub use super::material_request::Entity as MaterialRequest;
    pub use super::project::Entity as Project;
    pub use super::project_material::Entity as ProjectMaterial;
    pub use super::purchase_order::Entity as PurchaseOrder;
    pub use super::setting::Entity as Setting;
    pub use super::task::Entity as Task;
    pub use super::user::Entity as User;
}
