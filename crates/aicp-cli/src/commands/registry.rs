use std::path::PathBuf;

use aicp_core::Result;
use aicp_registry::ModelRegistry;

use super::RegistryAction;

pub async fn run(registry_path: PathBuf, action: RegistryAction) -> Result<()> {
    let registry = ModelRegistry::new(registry_path)?;

    match action {
        RegistryAction::List => {
            let models = registry.list_models();
            if models.is_empty() {
                println!("(no models registered)");
                return Ok(());
            }
            for (name, versions) in models {
                println!("{name}:");
                for v in versions {
                    let marker = match v.status {
                        aicp_registry::ModelStatus::Production => "* ",
                        _ => "  ",
                    };
                    println!(
                        "{marker}{} [{}]  {}/{}",
                        v.version,
                        format!("{:?}", v.status).to_lowercase(),
                        v.provider,
                        v.model_name
                    );
                }
            }
        }
        RegistryAction::Register {
            name,
            version,
            provider,
            model_name,
            description,
        } => {
            let registered = registry.register(&name, &version, &provider, &model_name, description)?;
            println!("registered {name}@{} ({}/{})", registered.version, registered.provider, registered.model_name);
        }
        RegistryAction::Promote { name, version } => {
            let promoted = registry.promote(&name, &version)?;
            println!("promoted {name}@{} to production", promoted.version);
        }
    }
    Ok(())
}
