use crate::error::AppError;
use crate::models::{
    ChapterInfo, ChatEntry, ChatRequest, DocumentKind, ExportFormat, ExportQuery,
    GenerateRequest, UploadResult,
};
use crate::services::export::{ASSISTANT_NAME, chat_transcript, to_pdf, to_word};
use crate::services::extract::{MAX_UPLOAD_CHARS, extract_upload};
use crate::services::llm::TextGenerator;
use crate::services::prompt::{answer_question, run_task};
use crate::session::SessionStore;
use axum::{
    Router,
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
};
use http::header;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

pub struct AppState<G> {
    pub generator: Arc<G>,
    pub sessions: Arc<SessionStore>,
}

impl<G> Clone for AppState<G> {
    fn clone(&self) -> Self {
        AppState {
            generator: Arc::clone(&self.generator),
            sessions: Arc::clone(&self.sessions),
        }
    }
}

pub fn router<G: TextGenerator + 'static>(state: AppState<G>, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
        .route("/sessions", post(create_session::<G>))
        .route(
            "/sessions/:id",
            get(view_session::<G>).delete(delete_session::<G>),
        )
        .route("/sessions/:id/upload", post(upload_file::<G>))
        .route("/sessions/:id/chapters", get(list_chapters::<G>))
        .route("/sessions/:id/generate", post(generate::<G>))
        .route("/sessions/:id/chat", get(chat_history::<G>).post(chat::<G>))
        .route("/sessions/:id/export/generated", get(export_generated::<G>))
        .route("/sessions/:id/export/chat", get(export_chat::<G>))
        .route("/sessions/:id/reset", post(reset_session::<G>))
        .with_state(state)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::AllowMethods::any())
                .allow_headers(tower_http::cors::AllowHeaders::any()),
        )
}

async fn index() -> Html<&'static str> {
    Html(
        r#"
    <!DOCTYPE html>
    <html>
    <head>
        <title>Curriculens</title>
        <meta charset="utf-8">
        <style>
            body { font-family: Arial, sans-serif; margin: 40px; }
            .info-box { background-color: #f0f8ff; padding: 20px; border-radius: 8px; margin: 20px 0; }
            .endpoint { background-color: #f5f5f5; padding: 10px; margin: 10px 0; border-radius: 4px; font-family: monospace; }
        </style>
    </head>
    <body>
        <h1>Curriculens</h1>

        <div class="info-box">
            <h2>Curriculum Assistant</h2>
            <p>Upload a syllabus or a book as PDF or Word, then generate lesson plans,
            quizzes, summaries and keywords, or ask questions about the content.</p>
            <p>Books are split into chapters so questions can be scoped to one chapter.</p>
        </div>

        <h2>Available Endpoints:</h2>
        <div class="endpoint">GET /health - Health check</div>
        <div class="endpoint">POST /sessions - Start a session</div>
        <div class="endpoint">GET /sessions/{id} - Session overview</div>
        <div class="endpoint">POST /sessions/{id}/upload - Upload a document (multipart: file, content_type)</div>
        <div class="endpoint">GET /sessions/{id}/chapters - Detected chapters</div>
        <div class="endpoint">POST /sessions/{id}/generate - Run a task (Lesson Plan, MCQs, Short Questions, Summarize, Extract Keywords)</div>
        <div class="endpoint">POST /sessions/{id}/chat - Ask a question; GET for the history</div>
        <div class="endpoint">GET /sessions/{id}/export/generated?format=pdf|word - Download generated content</div>
        <div class="endpoint">GET /sessions/{id}/export/chat?format=txt|word|pdf - Download the chat history</div>
        <div class="endpoint">POST /sessions/{id}/reset - Clear the session</div>

        <h2>How to Use:</h2>
        <ol>
            <li>Create a session.</li>
            <li>Upload a PDF or DOCX file with content_type Syllabus or Book.</li>
            <li>Explore chapters, generate content, or chat with Curriculens.</li>
            <li>Export your results.</li>
        </ol>
    </body>
    </html>
    "#,
    )
}

async fn health_check() -> &'static str {
    "OK"
}

async fn create_session<G: TextGenerator + 'static>(
    State(state): State<AppState<G>>,
) -> impl IntoResponse {
    let id = state.sessions.create();
    (
        StatusCode::CREATED,
        Json(serde_json::json!({ "success": true, "session_id": id })),
    )
}

async fn delete_session<G: TextGenerator + 'static>(
    State(state): State<AppState<G>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if state.sessions.remove(id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::SessionNotFound)
    }
}

async fn reset_session<G: TextGenerator + 'static>(
    State(state): State<AppState<G>>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.sessions.with_session(id, |session| session.reset())?;
    tracing::info!("reset session {}", id);
    Ok(Json(serde_json::json!({ "success": true })))
}

fn parse_kind(value: &str) -> Result<DocumentKind, AppError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "" | "syllabus" => Ok(DocumentKind::Syllabus),
        "book" => Ok(DocumentKind::Book),
        other => Err(AppError::BadRequest(format!(
            "content_type must be Syllabus or Book, got '{}'",
            other
        ))),
    }
}

fn chapter_list(session: &crate::session::Session) -> Vec<ChapterInfo> {
    session
        .chapters()
        .iter()
        .map(|(number, title)| ChapterInfo {
            number: *number,
            title: title.clone(),
        })
        .collect()
}

async fn upload_file<G: TextGenerator + 'static>(
    State(state): State<AppState<G>>,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<UploadResult>, AppError> {
    state.sessions.with_session(id, |_| ())?;

    let bad_multipart = |e: axum::extract::multipart::MultipartError| {
        AppError::BadRequest(format!("invalid upload: {}", e))
    };

    let mut upload: Option<(String, Vec<u8>)> = None;
    let mut kind = DocumentKind::default();

    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        let name = field.name().unwrap_or("unknown").to_string();
        match name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or("upload").to_string();
                let data = field.bytes().await.map_err(bad_multipart)?;
                upload = Some((filename, data.to_vec()));
            }
            "content_type" => {
                let value = field.text().await.map_err(bad_multipart)?;
                kind = parse_kind(&value)?;
            }
            other => tracing::debug!("ignoring multipart field {:?}", other),
        }
    }

    let Some((filename, bytes)) = upload else {
        return Err(AppError::BadRequest("missing 'file' field".to_string()));
    };
    tracing::info!("session {}: extracting {} ({} bytes)", id, filename, bytes.len());

    let extracted = extract_upload(&filename, bytes).await?;
    let characters = extracted.text.chars().count();

    let chapters = state.sessions.with_session(id, |session| {
        session.load_document(&filename, kind, extracted.text);
        chapter_list(session)
    })?;

    let mut warnings = Vec::new();
    if extracted.truncated {
        warnings.push(format!(
            "Uploaded document is large. Only the first {} characters will be used.",
            MAX_UPLOAD_CHARS
        ));
    }
    if kind == DocumentKind::Book && chapters.is_empty() {
        warnings.push("No chapters detected.".to_string());
    }
    tracing::info!(
        "session {}: loaded {} characters, {} chapters",
        id,
        characters,
        chapters.len()
    );

    Ok(Json(UploadResult {
        success: true,
        filename,
        characters,
        truncated: extracted.truncated,
        chapters,
        warnings,
    }))
}

async fn list_chapters<G: TextGenerator + 'static>(
    State(state): State<AppState<G>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<ChapterInfo>>, AppError> {
    Ok(Json(state.sessions.with_session(id, |session| chapter_list(session))?))
}

async fn generate<G: TextGenerator + 'static>(
    State(state): State<AppState<G>>,
    Path(id): Path<Uuid>,
    Json(request): Json<GenerateRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let (context, epoch) = state.sessions.with_session(id, |session| {
        session
            .context_for(request.chapter)
            .map(|context| (context, session.epoch()))
    })??;

    let content = run_task(request.task, &context, state.generator.as_ref()).await?;

    state
        .sessions
        .with_session(id, |session| session.record_generated(epoch, content.clone()))??;

    Ok(Json(serde_json::json!({
        "success": true,
        "task": request.task,
        "content": content,
    })))
}

async fn chat<G: TextGenerator + 'static>(
    State(state): State<AppState<G>>,
    Path(id): Path<Uuid>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    if request.question.trim().is_empty() {
        return Err(AppError::BadRequest("question must not be empty".to_string()));
    }

    let (context, epoch) = state.sessions.with_session(id, |session| {
        session
            .context_for(request.chapter)
            .map(|context| (context, session.epoch()))
    })??;

    let answer = answer_question(&request.question, &context, state.generator.as_ref()).await?;

    state.sessions.with_session(id, |session| {
        session.record_chat(
            epoch,
            ChatEntry {
                user: request.question.clone(),
                bot: answer.clone(),
                chapter: request.chapter,
            },
        )
    })??;

    Ok(Json(serde_json::json!({
        "success": true,
        "answer": answer,
    })))
}

async fn chat_history<G: TextGenerator + 'static>(
    State(state): State<AppState<G>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<ChatEntry>>, AppError> {
    let history: Vec<ChatEntry> = state.sessions.with_session(id, |session| {
        session.chat_history().iter().rev().cloned().collect()
    })?;
    Ok(Json(history))
}

fn download(text: &str, format: ExportFormat, stem: &str) -> Result<Response, AppError> {
    let bytes = match format {
        ExportFormat::Pdf => to_pdf(text)?,
        ExportFormat::Word => to_word(text)?,
        ExportFormat::Txt => text.as_bytes().to_vec(),
    };
    let filename = format!("{}.{}", stem, format.extension());
    Ok((
        [
            (header::CONTENT_TYPE, format.mime_type().to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        bytes,
    )
        .into_response())
}

async fn export_generated<G: TextGenerator + 'static>(
    State(state): State<AppState<G>>,
    Path(id): Path<Uuid>,
    Query(query): Query<ExportQuery>,
) -> Result<Response, AppError> {
    let text = state.sessions.with_session(id, |session| {
        (!session.generated().is_empty()).then(|| session.generated_document())
    })?;
    let Some(text) = text else {
        return Err(AppError::BadRequest("nothing has been generated yet".to_string()));
    };
    download(&text, query.format, "all_content")
}

async fn export_chat<G: TextGenerator + 'static>(
    State(state): State<AppState<G>>,
    Path(id): Path<Uuid>,
    Query(query): Query<ExportQuery>,
) -> Result<Response, AppError> {
    let text = state
        .sessions
        .with_session(id, |session| chat_transcript(session.chat_history()))?;
    download(&text, query.format, "chat_history")
}

async fn view_session<G: TextGenerator + 'static>(
    State(state): State<AppState<G>>,
    Path(id): Path<Uuid>,
) -> Result<Html<String>, AppError> {
    let page = state.sessions.with_session(id, |session| {
        let esc = |s: &str| html_escape::encode_text(s).into_owned();
        let mut html = String::from(
            "<!DOCTYPE html>\n<html>\n<head><title>Curriculens</title><meta charset=\"utf-8\"></head>\n<body>\n",
        );

        match session.filename() {
            Some(filename) => html.push_str(&format!(
                "<h1>{}</h1>\n<p>{:?}, {} characters</p>\n",
                esc(filename),
                session.kind(),
                session.text().map(|t| t.chars().count()).unwrap_or(0)
            )),
            None => html.push_str("<h1>No document uploaded</h1>\n"),
        }

        if !session.chapters().is_empty() {
            html.push_str("<h2>Detected Chapters</h2>\n<ul>\n");
            for (number, title) in session.chapters() {
                html.push_str(&format!(
                    "<li><b>Chapter {}:</b> {}</li>\n",
                    number,
                    esc(title)
                ));
            }
            html.push_str("</ul>\n");
        }

        if !session.generated().is_empty() {
            html.push_str("<h2>Generated Content</h2>\n");
            for content in session.generated() {
                html.push_str(&format!("<pre>{}</pre>\n", esc(content)));
            }
        }

        html.push_str("<h2>Chat History</h2>\n");
        for entry in session.chat_history().iter().rev() {
            let chapter_info = entry
                .chapter
                .map(|n| format!(" (Chapter {})", n))
                .unwrap_or_default();
            html.push_str(&format!(
                "<p><b>You{}:</b> {}</p>\n<p><b>{}:</b> {}</p>\n<hr>\n",
                chapter_info,
                esc(&entry.user),
                ASSISTANT_NAME,
                esc(&entry.bot)
            ));
        }

        html.push_str("</body>\n</html>\n");
        html
    })?;
    Ok(Html(page))
}
