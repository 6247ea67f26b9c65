use anyhow::Result;
use async_trait::async_trait;

pub mod build;

#[async_trait]
pub trait Command {
    async fn run(&self) -> Result<()>;
}

pub trait IntoCommand {
    fn into_command(self) -> Box<dyn Command>;
}

impl IntoCommand for crate::cli::Cli {
    fn into_command(self) -> Box<dyn Command> {
        Box::new(build::BuildCommand {
            options: self.build,
        })
    }
}
