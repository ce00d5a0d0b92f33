pub mod export;
pub mod forms;
pub mod settings;
pub mod upload;

pub use export::{export_boa, export_boa_tex};
pub use settings::{save_settings, settings_form};
pub use upload::{delete_custom_boa, set_custom_boa, upload_file};
