//! 终端前端 - 编排层
//!
//! 逐行读取命令，转换为 [`Action`] 交给控制器，再把返回的视图渲染到 stdout。
//! 日志走 stderr，两者互不干扰。

use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, info};

use crate::models::{option_index, Difficulty};
use crate::orchestrator::controller::{Action, Controller, Notice, Response, View};

pub const HELP: &str = "\
Commands:
  upload <path>                  upload lecture slides (PDF)
  difficulty <easy|medium|hard>  choose question difficulty
  count <1-30>                   choose how many questions to generate
  start                          generate questions and start the quiz
  answer <question> <A-D>        select an answer, e.g. `answer 3 B`
  submit                         submit your answers
  more [n]                       generate n new unique questions (default 1)
  download [path]                save the results as a PDF report
  show                           show the current screen again
  new                            discard this quiz and upload new slides
  help                           show this help
  quit                           exit";

/// 终端命令
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Upload(PathBuf),
    Difficulty(Difficulty),
    Count(usize),
    Start,
    /// 题号从 0 开始，选项为 0..4
    Answer { question: usize, option: usize },
    Submit,
    More(usize),
    Download(Option<PathBuf>),
    Show,
    New,
    Help,
    Quit,
}

/// 解析一行输入，失败时返回给用户的提示
pub fn parse_command(line: &str) -> Result<Command, String> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    match word.to_ascii_lowercase().as_str() {
        "upload" | "u" => {
            if rest.is_empty() {
                return Err("Usage: upload <path-to-pdf>".to_string());
            }
            Ok(Command::Upload(PathBuf::from(rest)))
        }
        "difficulty" | "d" => rest.parse::<Difficulty>().map(Command::Difficulty),
        "count" | "c" => rest
            .parse::<usize>()
            .map(Command::Count)
            .map_err(|_| "Usage: count <1-30>".to_string()),
        "start" | "s" => Ok(Command::Start),
        "answer" | "a" => parse_answer(rest),
        "submit" => Ok(Command::Submit),
        "more" | "m" => {
            if rest.is_empty() {
                return Ok(Command::More(1));
            }
            rest.parse::<usize>()
                .map(Command::More)
                .map_err(|_| "Usage: more [n]".to_string())
        }
        "download" | "save" => Ok(Command::Download(
            (!rest.is_empty()).then(|| PathBuf::from(rest)),
        )),
        "show" | "" => Ok(Command::Show),
        "new" | "reset" => Ok(Command::New),
        "help" | "h" | "?" => Ok(Command::Help),
        "quit" | "exit" | "q" => Ok(Command::Quit),
        other => Err(format!("Unknown command '{}'. Type `help` for a list.", other)),
    }
}

fn parse_answer(rest: &str) -> Result<Command, String> {
    const USAGE: &str = "Usage: answer <question-number> <A-D>";

    let mut parts = rest.split_whitespace();
    let (Some(number), Some(letter), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(USAGE.to_string());
    };

    let number: usize = number.parse().map_err(|_| USAGE.to_string())?;
    if number == 0 {
        return Err("Question numbers start at 1".to_string());
    }

    let mut chars = letter.chars();
    let option = match (chars.next(), chars.next()) {
        (Some(c), None) => option_index(c),
        _ => None,
    }
    .ok_or_else(|| format!("'{}' is not an option; choose A, B, C or D", letter))?;

    Ok(Command::Answer {
        question: number - 1,
        option,
    })
}

// ========== 渲染 ==========

/// 把控制器的响应渲染为终端文本
pub fn render(response: &Response) -> String {
    let mut out = render_view(&response.view);
    match &response.notice {
        Some(Notice::Info(msg)) => {
            let _ = writeln!(out, "\nℹ️  {}", msg);
        }
        Some(Notice::Error(msg)) => {
            let _ = writeln!(out, "\n❌ {}", msg);
        }
        None => {}
    }
    out
}

pub fn render_view(view: &View) -> String {
    let mut out = String::new();
    match view {
        View::Welcome {
            difficulty,
            question_count,
        } => {
            let _ = writeln!(out, "📚 Lecture Slides Quiz");
            let _ = writeln!(out, "Upload your lecture slides (PDF format) to begin: upload <path>");
            let _ = writeln!(
                out,
                "Difficulty: {} | Questions: {}",
                difficulty, question_count
            );
        }
        View::Configuring {
            file_name,
            source_chars,
            difficulty,
            question_count,
        } => {
            let _ = writeln!(
                out,
                "📄 {} loaded ({} characters of text)",
                file_name, source_chars
            );
            let _ = writeln!(
                out,
                "Difficulty: {} | Questions: {}",
                difficulty, question_count
            );
            let _ = writeln!(out, "Type `start` to generate the quiz.");
        }
        View::InProgress {
            difficulty,
            questions,
            answered,
        } => {
            let _ = writeln!(
                out,
                "📝 Quiz ({}) - answered {}/{}",
                difficulty,
                answered,
                questions.len()
            );
            for q in questions {
                let _ = writeln!(out, "\nQuestion {}: {}", q.number, q.prompt);
                for (letter, text) in &q.options {
                    let mark = if q.selected == Some(*letter) { ">" } else { " " };
                    let _ = writeln!(out, " {} {}. {}", mark, letter, text);
                }
            }
            let _ = writeln!(out, "\n`answer <n> <A-D>`, `more`, or `submit` when done.");
        }
        View::Submitted {
            score,
            verdict,
            review,
        } => {
            let _ = writeln!(out, "🏁 Final Score: {}", score);
            let _ = writeln!(out, "{}", verdict.message());
            for item in review {
                let icon = if item.is_correct { "✅" } else { "❌" };
                let _ = writeln!(
                    out,
                    "\n{} Question {}: {}",
                    icon,
                    item.number,
                    item.marker()
                );
                let _ = writeln!(out, "{}", item.prompt);
                for option in &item.options {
                    let mut line = format!("   {}. {}", option.letter, option.text);
                    if option.is_selected {
                        line.push_str(" (Your answer)");
                    }
                    if option.is_correct {
                        line.push_str(" (Correct answer)");
                    }
                    let _ = writeln!(out, "{}", line);
                }
                let _ = writeln!(out, "Your answer: {}", item.selected_label());
                let _ = writeln!(out, "Correct answer: {}", item.correct);
                let _ = writeln!(out, "Explanation: {}", item.explanation);
            }
            let _ = writeln!(out, "\n`download [path]` to save the report, `new` to start over.");
        }
    }
    out
}

// ========== 主循环 ==========

/// 运行交互循环，直到 `quit` 或输入结束
pub async fn run(controller: &mut Controller) -> Result<()> {
    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    let first = controller.handle(Action::Show).await;
    write_out(&mut stdout, &format!("{}\n{}\n", render(&first), HELP)).await?;

    loop {
        write_out(&mut stdout, "\n> ").await?;
        let Some(line) = lines.next_line().await? else {
            break;
        };

        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(msg) => {
                write_out(&mut stdout, &format!("❌ {}\n", msg)).await?;
                continue;
            }
        };
        debug!("收到命令: {:?}", command);

        let action = match command {
            Command::Quit => break,
            Command::Help => {
                write_out(&mut stdout, &format!("{}\n", HELP)).await?;
                continue;
            }
            Command::Upload(path) => match tokio::fs::read(&path).await {
                Ok(bytes) => Action::Upload {
                    file_name: path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_else(|| path.display().to_string()),
                    bytes,
                },
                Err(e) => {
                    write_out(
                        &mut stdout,
                        &format!("❌ Cannot read {}: {}\n", path.display(), e),
                    )
                    .await?;
                    continue;
                }
            },
            other => to_action(other),
        };

        if matches!(action, Action::Start | Action::AddMore { .. }) {
            write_out(&mut stdout, "⏳ Generating questions...\n").await?;
        }

        let response = controller.handle(action).await;
        write_out(&mut stdout, &render(&response)).await?;
    }

    info!("👋 退出");
    Ok(())
}

fn to_action(command: Command) -> Action {
    match command {
        Command::Difficulty(d) => Action::SetDifficulty(d),
        Command::Count(n) => Action::SetQuestionCount(n),
        Command::Start => Action::Start,
        Command::Answer { question, option } => Action::Answer { question, option },
        Command::Submit => Action::Submit,
        Command::More(count) => Action::AddMore { count },
        Command::Download(path) => Action::Download { path },
        Command::New => Action::NewQuiz,
        Command::Show | Command::Help | Command::Quit | Command::Upload(_) => Action::Show,
    }
}

async fn write_out(stdout: &mut tokio::io::Stdout, text: &str) -> std::io::Result<()> {
    stdout.write_all(text.as_bytes()).await?;
    stdout.flush().await
}
