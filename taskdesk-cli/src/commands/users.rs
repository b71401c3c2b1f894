//! Users command - list accounts (admins only)

use anyhow::{bail, Result};

use super::{get_context, require_user};
use crate::output;

pub async fn run(json: bool) -> Result<()> {
    let ctx = get_context()?;
    let user = require_user(&ctx).await?;

    if !user.role.can_list_users() {
        bail!("Only admins can list users");
    }

    let spinner = output::spinner("Loading users...");
    let users = ctx.tasks.list_users().await;
    output::finish(spinner);

    if json {
        println!("{}", serde_json::to_string_pretty(&users)?);
    } else {
        output::print_users(&users);
    }
    Ok(())
}
