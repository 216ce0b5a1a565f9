use async_trait::async_trait;
use lecture_quiz::error::GenerationError;
use lecture_quiz::services::{report_exporter, text_extractor};
use lecture_quiz::utils::logging;
use lecture_quiz::{
    Action, Config, Controller, Difficulty, LlmBackend, LlmService, Notice, QuestionGenerator,
    View,
};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// 按顺序返回预设响应的 LLM
struct ScriptedLlm {
    responses: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedLlm {
    fn new(responses: Vec<String>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmBackend for ScriptedLlm {
    async fn complete(
        &self,
        user_message: &str,
        _system_message: Option<&str>,
    ) -> Result<String, GenerationError> {
        self.prompts.lock().unwrap().push(user_message.to_string());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| GenerationError::EmptyContent {
                model: "scripted".to_string(),
            })
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

/// 模型返回的题目 JSON，答案依次为 A、B、C、D
fn batch_json(prompts: &[&str]) -> String {
    let questions: Vec<serde_json::Value> = prompts
        .iter()
        .enumerate()
        .map(|(i, prompt)| {
            serde_json::json!({
                "question": prompt,
                "options": {
                    "A": format!("{} - first", prompt),
                    "B": format!("{} - second", prompt),
                    "C": format!("{} - third", prompt),
                    "D": format!("{} - fourth", prompt),
                },
                "correct_answer": (["A", "B", "C", "D"][i % 4]),
                "explanation": "Stated on the slides.",
            })
        })
        .collect();
    // 模型常在 JSON 外包一层 markdown
    format!(
        "```json\n{}\n```",
        serde_json::json!({ "questions": questions })
    )
}

/// 一页带文字的课件 PDF
fn slides_pdf(lines: &[&str]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut operations = vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F1".into(), Object::Integer(14)]),
        Operation::new("Td", vec![Object::Integer(72), Object::Integer(720)]),
    ];
    for line in lines {
        operations.push(Operation::new(
            "Tj",
            vec![Object::string_literal(line.to_string())],
        ));
        operations.push(Operation::new(
            "Td",
            vec![Object::Integer(0), Object::Integer(-20)],
        ));
    }
    operations.push(Operation::new("ET", vec![]));

    let content = Content { operations };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(page_id)],
            "Count" => 1,
            "Resources" => resources_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(595),
                Object::Integer(842),
            ],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

fn controller(llm: Arc<ScriptedLlm>) -> Controller {
    let config = Config {
        default_question_count: 3,
        default_difficulty: Difficulty::Easy,
        report_dir: std::env::temp_dir(),
        ..Config::default()
    };
    let generator = QuestionGenerator::new(llm, config.max_source_chars);
    Controller::new(generator, &config)
}

#[tokio::test]
async fn test_pdf_text_extraction() {
    let text = text_extractor::extract(&slides_pdf(&[
        "Transport Layer",
        "TCP provides reliable delivery",
    ]))
    .expect("提取文本失败");

    assert!(text.contains("Transport Layer"));
    assert!(text.contains("reliable delivery"));
}

#[tokio::test]
async fn test_complete_quiz_flow() {
    logging::init(false);

    let llm = ScriptedLlm::new(vec![
        batch_json(&["What does TCP provide?", "What is UDP?", "What is a port?"]),
        batch_json(&["What is a checksum?"]),
    ]);
    let mut controller = controller(llm.clone());

    // 上传
    let response = controller
        .handle(Action::Upload {
            file_name: "week3.pdf".to_string(),
            bytes: slides_pdf(&["Transport Layer", "TCP provides reliable delivery"]),
        })
        .await;
    assert!(response.notice.is_none(), "上传应成功: {:?}", response.notice);
    assert!(matches!(
        response.view,
        View::Configuring {
            difficulty: Difficulty::Easy,
            question_count: 3,
            ..
        }
    ));

    // 开始
    let response = controller.handle(Action::Start).await;
    let View::InProgress { questions, .. } = response.view else {
        panic!("应进入作答状态: {:?}", response.notice);
    };
    assert_eq!(questions.len(), 3);
    let first_prompt = &llm.prompts()[0];
    assert!(first_prompt.contains("Generate exactly 3 multiple choice questions"));
    assert!(first_prompt.contains("reliable delivery"));

    // 作答：第 1 题正确（A），第 2 题错误（正确为 B），第 3 题不答
    controller
        .handle(Action::Answer {
            question: 0,
            option: 0,
        })
        .await;
    controller
        .handle(Action::Answer {
            question: 1,
            option: 2,
        })
        .await;

    // 追加一题，提示词中应排除已有题目
    let response = controller.handle(Action::AddMore { count: 1 }).await;
    assert!(matches!(response.view, View::InProgress { ref questions, .. } if questions.len() == 4));
    assert!(llm.prompts()[1].contains("What does TCP provide?"));

    controller
        .handle(Action::Answer {
            question: 3,
            option: 3,
        })
        .await;

    // 提交
    let response = controller.handle(Action::Submit).await;
    let View::Submitted { score, review, .. } = response.view else {
        panic!("应进入已提交状态");
    };
    assert_eq!(score.correct_count, 1);
    assert_eq!(score.total, 4);
    assert_eq!(score.per_question_correct, vec![true, false, false, false]);
    assert_eq!(review[2].selected_label(), "Not answered");

    // 提交后不可修改
    let response = controller
        .handle(Action::Answer {
            question: 2,
            option: 2,
        })
        .await;
    assert!(matches!(response.notice, Some(Notice::Error(_))));

    // 下载报告
    let path = std::env::temp_dir().join("lecture_quiz_integration_report.pdf");
    let response = controller
        .handle(Action::Download {
            path: Some(path.clone()),
        })
        .await;
    assert!(matches!(response.notice, Some(Notice::Info(_))));

    let bytes = tokio::fs::read(&path).await.unwrap();
    let report = Document::load_mem(&bytes).expect("报告应为合法 PDF");
    assert!(!report.get_pages().is_empty());
    let _ = tokio::fs::remove_file(&path).await;
}

#[tokio::test]
async fn test_exported_report_text_round_trip() {
    let llm = ScriptedLlm::new(vec![batch_json(&["What is a socket?"])]);
    let mut controller = controller(llm);

    controller
        .handle(Action::Upload {
            file_name: "slides.pdf".to_string(),
            bytes: slides_pdf(&["Sockets connect processes"]),
        })
        .await;
    controller.handle(Action::SetQuestionCount(1)).await;
    controller.handle(Action::Start).await;
    controller.handle(Action::Submit).await;

    let session = controller.session().expect("会话应存在");
    let bytes = report_exporter::export(session).unwrap();
    let text = text_extractor::extract(&bytes).unwrap();

    assert!(text.contains("MCQ Quiz Results"));
    assert!(text.contains("What is a socket?"));
    assert!(text.contains("Not answered"));
}

#[tokio::test]
async fn test_short_batch_fails_without_changing_session() {
    let llm = ScriptedLlm::new(vec![batch_json(&["Only one?"])]);
    let mut controller = controller(llm);

    controller
        .handle(Action::Upload {
            file_name: "slides.pdf".to_string(),
            bytes: slides_pdf(&["Some lecture"]),
        })
        .await;
    let response = controller.handle(Action::Start).await;

    assert!(matches!(
        response.notice,
        Some(Notice::Error(ref msg)) if msg.contains("expected 3 questions")
    ));
    assert!(matches!(response.view, View::Configuring { .. }));
}

#[tokio::test]
async fn test_scanned_pdf_is_rejected() {
    let llm = ScriptedLlm::new(vec![]);
    let mut controller = controller(llm.clone());

    let response = controller
        .handle(Action::Upload {
            file_name: "scan.pdf".to_string(),
            bytes: slides_pdf(&[]),
        })
        .await;

    assert!(matches!(
        response.notice,
        Some(Notice::Error(ref msg)) if msg.contains("scanned or image-based")
    ));
    assert!(matches!(response.view, View::Welcome { .. }));
    assert!(llm.prompts().is_empty());
}

#[tokio::test]
#[ignore] // 需要真实 API 密钥：cargo test -- --ignored
async fn test_live_generation() {
    dotenv::dotenv().ok();
    logging::init(true);

    let config = Config::load().expect("加载配置失败");
    config.validate().expect("缺少 API 密钥");

    let generator = QuestionGenerator::new(
        Arc::new(LlmService::new(&config)),
        config.max_source_chars,
    );
    let mut controller = Controller::new(generator, &config);

    controller
        .handle(Action::Upload {
            file_name: "slides.pdf".to_string(),
            bytes: slides_pdf(&[
                "The Transmission Control Protocol provides reliable ordered delivery.",
                "UDP is connectionless and does not retransmit lost datagrams.",
                "Port numbers identify processes on a host.",
            ]),
        })
        .await;
    controller.handle(Action::SetQuestionCount(3)).await;
    let response = controller.handle(Action::Start).await;

    assert!(
        matches!(response.view, View::InProgress { ref questions, .. } if questions.len() == 3),
        "生成失败: {:?}",
        response.notice
    );
}
