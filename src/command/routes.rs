use anyhow::Result;

use crate::config::AppConfig;
use crate::router::{Route, RouteTable, RouteTarget};

/// Who may activate a route.
fn access(route: &Route) -> String {
    if !route.guarded {
        return "open".to_string();
    }
    if route.data.public {
        return "public".to_string();
    }
    if !route.data.requires_roles() {
        return "login".to_string();
    }
    let mut label = format!("roles: {}", route.data.roles.join(", "));
    if !route.data.unmatchable_roles.is_empty() {
        label.push_str(&format!(
            " (never granted: {})",
            route.data.unmatchable_roles.join(", ")
        ));
    }
    label
}

fn target(route: &Route) -> String {
    match &route.target {
        RouteTarget::View(view) => format!("{:?}", view),
        RouteTarget::Redirect(to) => format!("-> /{}", to),
    }
}

pub async fn run_routes(config: AppConfig) -> Result<()> {
    let table = RouteTable::load_or_default(config.routes_file.as_deref())?;

    match &config.routes_file {
        Some(path) => println!("📋 Routes from {}:\n", path.display()),
        None => println!("📋 Built-in routes:\n"),
    }
    for route in table.routes() {
        println!(
            "   {:<20} {:<18} {}",
            format!("/{}", route.path),
            target(route),
            access(route)
        );
    }

    Ok(())
}
