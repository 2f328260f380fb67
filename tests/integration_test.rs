use qa_explain_bot::logger;
use qa_explain_bot::{
    Config, ExplainedQuestion, ExplanationGenerator, QuestionBank, QuestionExtractor,
    TelegramClient, FALLBACK_EXPLANATION,
};

const SAMPLE_DOCUMENT: &str = "1. What is 2+2?\n\
a) 3\n\
b) 4 ✅\n\
c) 5\n\
d) 6\n\
Ex: Basic addition\n\
2. Capital of France?\n\
a) Berlin\n\
b) Madrid\n\
c) Paris ✅\n\
d) Rome\n\
Ex: Geography basics";

#[tokio::test]
async fn test_extract_and_generate_without_credentials() {
    // 初始化日志
    logger::init();

    // 无凭据配置，生成链为空
    let config = Config {
        generation_pause_secs: 0,
        ..Default::default()
    };

    // 抽取题目
    let extractor = QuestionExtractor::new(&config);
    let records = extractor.extract(SAMPLE_DOCUMENT);

    assert_eq!(records.len(), 2, "应该抽取出 2 道题目");
    assert_eq!(records[0].stem, "What is 2+2?");
    assert_eq!(records[0].correct_label, qa_explain_bot::Label::B);
    assert_eq!(records[1].correct_label, qa_explain_bot::Label::C);

    // 空服务链下全部落到兜底文案
    let generator = ExplanationGenerator::new(&config);
    let explained = generator.generate_batch(&records, 5).await;

    assert_eq!(explained.len(), 2, "应该为每道题生成一条讲解");
    for item in &explained {
        assert_eq!(
            item.explanation, FALLBACK_EXPLANATION,
            "没有可用服务时应该返回兜底文案"
        );
    }
}

#[tokio::test]
async fn test_bank_roundtrip() {
    // 初始化日志
    logger::init();

    let dir = tempfile::tempdir().expect("创建临时目录失败");
    let config = Config {
        bank_folder: dir.path().join("bank").display().to_string(),
        ..Default::default()
    };

    let extractor = QuestionExtractor::new(&config);
    let records = extractor.extract(SAMPLE_DOCUMENT);
    let explained: Vec<ExplainedQuestion> = records
        .into_iter()
        .map(|record| ExplainedQuestion {
            record,
            explanation: "Stored explanation.".to_string(),
        })
        .collect();

    // 入库后能随机抽回
    let bank = QuestionBank::new(&config);
    let total = bank
        .add_questions("math_quiz", &explained)
        .await
        .expect("题目入库失败");
    assert_eq!(total, 2, "入库后应该共有 2 道题目");

    let drawn = bank
        .random_question("math_quiz")
        .await
        .expect("随机抽题失败");
    assert!(drawn.is_some(), "应该能从题库里抽到题目");
}

#[tokio::test]
#[ignore] // 默认忽略，需要真实 TELEGRAM_BOT_TOKEN：cargo test -- --ignored
async fn test_telegram_get_me() {
    // 初始化日志
    logger::init();

    // 加载配置
    let config = Config::from_env();

    let client = TelegramClient::new(config.telegram_bot_token.clone(), config.poll_timeout_secs);
    let me = client.get_me().await.expect("getMe 调用失败");

    println!("已连接机器人: @{:?} (id {})", me.username, me.id);
    assert!(me.id > 0, "机器人 ID 应该有效");
}

#[tokio::test]
#[ignore]
async fn test_generate_with_real_providers() {
    // 初始化日志
    logger::init();

    // 加载配置
    let config = Config::from_env();

    let extractor = QuestionExtractor::new(&config);
    let records = extractor.extract(SAMPLE_DOCUMENT);
    assert!(!records.is_empty(), "样例文本应该能抽出题目");

    let generator = ExplanationGenerator::new(&config);
    let explanation = generator.generate(&records[0]).await;

    println!("========== 生成结果 ==========");
    println!("{}", explanation);
    println!("==============================");

    assert!(!explanation.is_empty(), "讲解不应为空");
    assert_ne!(
        explanation, FALLBACK_EXPLANATION,
        "配置了真实服务时应该生成讲解而不是兜底文案"
    );
}
