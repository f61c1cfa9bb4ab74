mod commands;

use commands::{ai, chat, documents, flashcards, quizzes, settings};
use mentora_core::Database;
use tauri::Manager;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("mentora=info,mentora_lib=info,mentora_core=info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    init_tracing();

    tauri::Builder::default()
        .plugin(tauri_plugin_opener::init())
        .plugin(tauri_plugin_dialog::init())
        .setup(|app| {
            let app_dir = app.path().app_data_dir()?;
            let database = Database::new(&app_dir)?;
            tracing::info!(path = %app_dir.display(), "database ready");
            app.manage(database);
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            documents::import_document,
            documents::reprocess_document,
            documents::list_documents,
            documents::get_document,
            documents::get_document_chunks,
            documents::delete_document,
            flashcards::generate_flashcards,
            flashcards::list_flashcard_sets,
            flashcards::get_flashcard_sets,
            flashcards::get_flashcard_set,
            flashcards::delete_flashcard_set,
            flashcards::review_flashcard,
            flashcards::toggle_star_flashcard,
            quizzes::generate_quiz,
            quizzes::list_quizzes,
            quizzes::get_quiz,
            quizzes::delete_quiz,
            quizzes::submit_quiz,
            quizzes::get_quiz_results,
            ai::generate_summary,
            ai::explain_concept,
            chat::chat_with_document,
            chat::get_chat_history,
            chat::clear_chat_history,
            settings::get_settings,
            settings::set_setting,
            settings::delete_setting,
            settings::get_available_models,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
