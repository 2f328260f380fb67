/// 程序配置文件
#[derive(Clone, Debug)]
pub struct Config {
    /// Telegram Bot Token（为空时启动失败）
    pub telegram_bot_token: String,
    /// 长轮询等待秒数
    pub poll_timeout_secs: u64,
    /// 单次请求处理的题目数上限
    pub max_questions_per_request: usize,
    /// 逐题生成之间的停顿秒数
    pub generation_pause_secs: u64,
    /// 单次生成尝试的超时秒数
    pub provider_timeout_secs: u64,
    /// 是否启用严格字符过滤
    pub strict_normalize: bool,
    /// 题库存放目录
    pub bank_folder: String,
    /// 输出日志文件
    pub output_log_file: String,
    // --- 生成服务配置（凭据缺省的服务不参与生成链） ---
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub openrouter_api_key: Option<String>,
    pub openrouter_model: String,
    pub huggingface_api_key: Option<String>,
    pub huggingface_model: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            telegram_bot_token: String::new(),
            poll_timeout_secs: 30,
            max_questions_per_request: 5,
            generation_pause_secs: 1,
            provider_timeout_secs: 30,
            strict_normalize: false,
            bank_folder: "question_bank".to_string(),
            output_log_file: "output.txt".to_string(),
            gemini_api_key: None,
            gemini_model: "gemini-pro".to_string(),
            openrouter_api_key: None,
            openrouter_model: "google/gemini-pro".to_string(),
            huggingface_api_key: None,
            huggingface_model: "microsoft/DialoGPT-large".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            telegram_bot_token: std::env::var("TELEGRAM_BOT_TOKEN").unwrap_or(default.telegram_bot_token),
            poll_timeout_secs: std::env::var("POLL_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.poll_timeout_secs),
            max_questions_per_request: std::env::var("MAX_QUESTIONS_PER_REQUEST").ok().and_then(|v| v.parse().ok()).unwrap_or(default.max_questions_per_request),
            generation_pause_secs: std::env::var("GENERATION_PAUSE_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.generation_pause_secs),
            provider_timeout_secs: std::env::var("PROVIDER_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.provider_timeout_secs),
            strict_normalize: std::env::var("STRICT_NORMALIZE").ok().and_then(|v| v.parse().ok()).unwrap_or(default.strict_normalize),
            bank_folder: std::env::var("BANK_FOLDER").unwrap_or(default.bank_folder),
            output_log_file: std::env::var("OUTPUT_LOG_FILE").unwrap_or(default.output_log_file),
            gemini_api_key: std::env::var("GEMINI_API_KEY").ok().filter(|v| !v.is_empty()),
            gemini_model: std::env::var("GEMINI_MODEL").unwrap_or(default.gemini_model),
            openrouter_api_key: std::env::var("OPENROUTER_API_KEY").ok().filter(|v| !v.is_empty()),
            openrouter_model: std::env::var("OPENROUTER_MODEL").unwrap_or(default.openrouter_model),
            huggingface_api_key: std::env::var("HUGGINGFACE_API_KEY").ok().filter(|v| !v.is_empty()),
            huggingface_model: std::env::var("HUGGINGFACE_MODEL").unwrap_or(default.huggingface_model),
        }
    }
}
