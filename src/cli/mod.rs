pub mod import_inventory;
