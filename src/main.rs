use anyhow::Result;
use lecture_quiz::utils::logging;
use lecture_quiz::{App, Config};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // 读取 .env（不存在时忽略）
    dotenv::dotenv().ok();

    // 加载配置：默认值 → quiz.toml → 环境变量
    let config = Config::load()?;

    // 初始化日志
    logging::init(config.verbose_logging);

    // 初始化并运行应用
    App::initialize(config)?.run().await?;

    Ok(())
}
