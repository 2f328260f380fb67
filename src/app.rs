use crate::api::TelegramClient;
use crate::bot::QaBot;
use crate::config::Config;
use crate::error::AppError;
use crate::utils::logging::{init_log_file, log_startup};
use anyhow::Result;
use std::time::Duration;
use tracing::{error, info};

/// 应用主结构
pub struct App {
    config: Config,
    client: TelegramClient,
    bot: QaBot,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        // 初始化日志文件
        init_log_file(&config.output_log_file)?;

        log_startup(config.max_questions_per_request);

        if config.telegram_bot_token.is_empty() {
            return Err(AppError::env_var_not_found("TELEGRAM_BOT_TOKEN").into());
        }

        // 连接 Telegram，验证凭据
        let client = TelegramClient::new(
            config.telegram_bot_token.clone(),
            config.poll_timeout_secs,
        );
        let me = client.get_me().await?;
        info!(
            "🤖 已连接: @{} (id {})",
            me.username.as_deref().unwrap_or("unknown"),
            me.id
        );

        let bot = QaBot::new(&config, client.clone());

        Ok(Self {
            config,
            client,
            bot,
        })
    }

    /// 运行长轮询主循环
    pub async fn run(&self) -> Result<()> {
        info!(
            "🚀 开始轮询更新 (长轮询 {} 秒)",
            self.config.poll_timeout_secs
        );

        let mut offset: i64 = 0;
        loop {
            let updates = match self.client.get_updates(offset).await {
                Ok(updates) => updates,
                Err(e) => {
                    error!("❌ 拉取更新失败: {}，3 秒后重试", e);
                    tokio::time::sleep(Duration::from_secs(3)).await;
                    continue;
                }
            };

            for update in &updates {
                offset = offset.max(update.update_id + 1);
                info!("[消息 {}] 收到更新", update.update_id);
                self.bot.process(update).await;
            }
        }
    }
}
