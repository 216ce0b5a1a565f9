//! 成绩报告导出服务 - 业务能力层
//!
//! 分两步：
//! 1. `ReportDocument::build` 从已提交的会话生成报告内容（纯数据，可测试）
//! 2. `render_pdf` 把报告内容排版成 PDF（Letter 纸张、Helvetica、自动换行和分页）

use chrono::{DateTime, Local};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use std::path::Path;
use tracing::{debug, info};

use crate::error::{AppError, AppResult, ReportError};
use crate::models::{option_letter, Score, Verdict};
use crate::workflow::QuizSession;

/// 报告中的单个选项
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewOption {
    pub letter: char,
    pub text: String,
    pub is_selected: bool,
    pub is_correct: bool,
}

/// 报告中的单道题回顾
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewItem {
    /// 从 1 开始的题号
    pub number: usize,
    pub prompt: String,
    pub options: Vec<ReviewOption>,
    pub selected: Option<char>,
    pub correct: char,
    pub explanation: String,
    pub is_correct: bool,
}

impl ReviewItem {
    pub fn marker(&self) -> &'static str {
        if self.is_correct {
            "Correct"
        } else {
            "Incorrect"
        }
    }

    pub fn selected_label(&self) -> String {
        match self.selected {
            Some(letter) => letter.to_string(),
            None => "Not answered".to_string(),
        }
    }
}

/// 报告内容
#[derive(Debug, Clone, PartialEq)]
pub struct ReportDocument {
    pub title: String,
    pub score: Score,
    pub verdict: Verdict,
    pub items: Vec<ReviewItem>,
}

impl ReportDocument {
    /// 从已提交的会话生成报告内容，题目顺序与会话一致
    ///
    /// 会话未提交时返回 `InvalidState`
    pub fn build(session: &QuizSession) -> AppResult<Self> {
        if !session.submitted() {
            return Err(AppError::invalid_state("export", session.state().name()));
        }
        let score = session.score()?;

        let items = session
            .questions()
            .iter()
            .enumerate()
            .map(|(i, question)| {
                let selected = session.answer_for(i);
                let options = question
                    .options
                    .iter()
                    .enumerate()
                    .map(|(j, text)| ReviewOption {
                        letter: option_letter(j),
                        text: text.clone(),
                        is_selected: selected == Some(j),
                        is_correct: j == question.correct_option_index,
                    })
                    .collect();

                ReviewItem {
                    number: i + 1,
                    prompt: question.prompt.clone(),
                    options,
                    selected: selected.map(option_letter),
                    correct: option_letter(question.correct_option_index),
                    explanation: question.explanation.clone(),
                    is_correct: score.per_question_correct[i],
                }
            })
            .collect();

        Ok(Self {
            title: "MCQ Quiz Results".to_string(),
            verdict: score.verdict(),
            score,
            items,
        })
    }
}

/// 导出已提交会话的 PDF 报告
pub fn export(session: &QuizSession) -> AppResult<Vec<u8>> {
    let report = ReportDocument::build(session)?;
    let bytes = render_pdf(&report, Local::now())?;
    info!(
        "📄 报告已生成: {} 道题, {} 字节",
        report.items.len(),
        bytes.len()
    );
    Ok(bytes)
}

/// 导出并写入文件
pub async fn export_to_file(session: &QuizSession, path: &Path) -> AppResult<()> {
    let bytes = export(session)?;
    tokio::fs::write(path, &bytes)
        .await
        .map_err(|source| ReportError::WriteFailed {
            path: path.display().to_string(),
            source,
        })?;
    info!("💾 报告已保存至: {}", path.display());
    Ok(())
}

// ========== PDF 排版 ==========

const PAGE_WIDTH: i64 = 612;
const PAGE_HEIGHT: i64 = 792;
const MARGIN: i64 = 50;
/// 低于此高度时换页
const BOTTOM_LIMIT: i64 = 100;
const REGULAR_FONT: &str = "F1";
const BOLD_FONT: &str = "F2";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    Black,
    Green,
    Red,
}

impl Color {
    fn operands(self) -> Vec<Object> {
        match self {
            Color::Black => vec![Object::Real(0.0), Object::Real(0.0), Object::Real(0.0)],
            Color::Green => vec![Object::Real(0.0), Object::Real(0.5), Object::Real(0.0)],
            Color::Red => vec![Object::Real(1.0), Object::Real(0.0), Object::Real(0.0)],
        }
    }
}

/// 逐页收集绘制指令
struct PageWriter {
    pages: Vec<Vec<Operation>>,
    current: Vec<Operation>,
    y: i64,
}

impl PageWriter {
    fn new() -> Self {
        Self {
            pages: Vec::new(),
            current: Vec::new(),
            y: PAGE_HEIGHT - MARGIN,
        }
    }

    fn ensure_space(&mut self, needed: i64) {
        if self.y - needed < BOTTOM_LIMIT && !self.current.is_empty() {
            self.pages.push(std::mem::take(&mut self.current));
            self.y = PAGE_HEIGHT - MARGIN;
        }
    }

    /// 单行文字，写完后 y 下移 `advance`
    fn line(&mut self, text: &str, x: i64, font: &str, size: i64, color: Color, advance: i64) {
        self.ensure_space(advance);
        self.current.push(Operation::new("BT", vec![]));
        self.current.push(Operation::new("rg", color.operands()));
        self.current
            .push(Operation::new("Tf", vec![font.into(), Object::Integer(size)]));
        self.current.push(Operation::new(
            "Td",
            vec![Object::Integer(x), Object::Integer(self.y)],
        ));
        self.current
            .push(Operation::new("Tj", vec![Object::string_literal(encode_win_ansi(text))]));
        self.current.push(Operation::new("ET", vec![]));
        self.y -= advance;
    }

    /// 自动换行的段落
    fn paragraph(&mut self, text: &str, x: i64, font: &str, size: i64, color: Color) {
        let max_width = PAGE_WIDTH - MARGIN - x;
        for line in wrap_text(text, max_width, size) {
            self.line(&line, x, font, size, color, 15);
        }
    }

    fn gap(&mut self, amount: i64) {
        self.y -= amount;
    }

    fn finish(mut self) -> Vec<Vec<Operation>> {
        if !self.current.is_empty() || self.pages.is_empty() {
            self.pages.push(self.current);
        }
        self.pages
    }
}

/// 按 Helvetica 平均字宽（约 0.5 em）估算换行
fn wrap_text(text: &str, max_width: i64, font_size: i64) -> Vec<String> {
    let max_chars = ((max_width * 2) / font_size.max(1)).max(10) as usize;
    let mut lines = Vec::new();
    let mut line = String::new();

    for word in text.split_whitespace() {
        let needed = if line.is_empty() {
            word.chars().count()
        } else {
            line.chars().count() + 1 + word.chars().count()
        };
        if needed > max_chars && !line.is_empty() {
            lines.push(std::mem::take(&mut line));
        }
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(word);
    }
    if !line.is_empty() || lines.is_empty() {
        lines.push(line);
    }
    lines
}

/// 标准字体只支持单字节编码，超出 Latin-1 的字符替换为 '?'
fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' => b'\'',
            '\u{201C}' | '\u{201D}' => b'"',
            '\u{2013}' | '\u{2014}' => b'-',
            c if (c as u32) < 0x100 && !c.is_control() => c as u32 as u8,
            _ => b'?',
        })
        .collect()
}

fn layout(report: &ReportDocument, generated_at: DateTime<Local>) -> Vec<Vec<Operation>> {
    let mut writer = PageWriter::new();

    // 标题与总分
    writer.line(&report.title, MARGIN, BOLD_FONT, 16, Color::Black, 20);
    writer.line(
        &format!("Generated: {}", generated_at.format("%Y-%m-%d %H:%M:%S")),
        MARGIN,
        REGULAR_FONT,
        10,
        Color::Black,
        20,
    );
    writer.line(
        &format!("Final Score: {}", report.score),
        MARGIN,
        BOLD_FONT,
        12,
        Color::Black,
        18,
    );
    writer.line(
        report.verdict.message(),
        MARGIN,
        REGULAR_FONT,
        12,
        Color::Black,
        30,
    );

    for item in &report.items {
        writer.ensure_space(60);
        writer.line(
            &format!("Question {}: {}", item.number, item.marker()),
            MARGIN,
            BOLD_FONT,
            12,
            if item.is_correct { Color::Green } else { Color::Red },
            20,
        );
        writer.paragraph(&item.prompt, MARGIN, REGULAR_FONT, 12, Color::Black);
        writer.gap(10);

        for option in &item.options {
            let color = match (option.is_selected, option.is_correct) {
                (true, true) => Color::Green,
                (true, false) => Color::Red,
                (false, true) => Color::Green,
                (false, false) => Color::Black,
            };
            let mut text = format!("{}. {}", option.letter, option.text);
            if option.is_selected {
                text.push_str(" (Your answer)");
            }
            if option.is_correct {
                text.push_str(" (Correct answer)");
            }
            writer.paragraph(&text, MARGIN + 20, REGULAR_FONT, 12, color);
            writer.gap(5);
        }

        writer.gap(5);
        writer.line(
            &format!(
                "Your answer: {}    Correct answer: {}",
                item.selected_label(),
                item.correct
            ),
            MARGIN + 20,
            REGULAR_FONT,
            10,
            Color::Black,
            15,
        );
        writer.line("Explanation:", MARGIN, BOLD_FONT, 10, Color::Black, 15);
        writer.paragraph(&item.explanation, MARGIN + 20, REGULAR_FONT, 10, Color::Black);
        writer.gap(30);
    }

    writer.finish()
}

/// 把报告内容渲染为 PDF 字节
///
/// 相同内容和时间戳得到相同排版
pub fn render_pdf(
    report: &ReportDocument,
    generated_at: DateTime<Local>,
) -> Result<Vec<u8>, ReportError> {
    let pages = layout(report, generated_at);
    debug!("报告共 {} 页", pages.len());

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let regular_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let bold_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            REGULAR_FONT => regular_id,
            BOLD_FONT => bold_id,
        },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for operations in pages {
        let page_id = add_page(&mut doc, pages_id, resources_id, operations)?;
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => media_box(),
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)
        .map_err(|e| ReportError::Render(e.to_string()))?;
    Ok(bytes)
}

fn add_page(
    doc: &mut Document,
    pages_id: ObjectId,
    resources_id: ObjectId,
    operations: Vec<Operation>,
) -> Result<ObjectId, ReportError> {
    let content = Content { operations };
    let encoded = content
        .encode()
        .map_err(|e| ReportError::Render(e.to_string()))?;
    let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));

    Ok(doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => resources_id,
        "MediaBox" => media_box(),
    }))
}

fn media_box() -> Vec<Object> {
    vec![
        Object::Integer(0),
        Object::Integer(0),
        Object::Integer(PAGE_WIDTH),
        Object::Integer(PAGE_HEIGHT),
    ]
}
