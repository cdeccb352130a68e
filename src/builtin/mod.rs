//! Rule sets shipped with the crate.
pub mod monitoring;
pub mod root;

pub use monitoring::MonitoringDeprecations;
pub use root::CoreDeprecations;

use crate::registry::RegistryBuilder;

/// Appends the root rules followed by the bundled plugins.
pub fn bundled(builder: RegistryBuilder) -> RegistryBuilder {
    builder
        .provider("", &CoreDeprecations)
        .plugin::<MonitoringDeprecations>()
}
