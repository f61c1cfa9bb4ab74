use crate::db::models::{Quiz, ResolvedAnswer, SubmittedAnswer};
use crate::db::Database;
use crate::error::{MentoraError, Result};
use crate::grading::{grade_submission, question_results, QuestionResult};
use serde::Serialize;
use tracing::info;

#[derive(Debug, Clone, Serialize)]
pub struct QuizSubmission {
    pub quiz_id: String,
    pub score: u32,
    pub correct_count: u32,
    pub total_questions: u32,
    pub user_answers: Vec<ResolvedAnswer>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuizResults {
    pub quiz_id: String,
    pub title: String,
    pub document_id: String,
    pub score: u32,
    pub correct_count: u32,
    pub total_questions: u32,
    pub completed_at: Option<String>,
    pub results: Vec<QuestionResult>,
}

/// Grade and record a quiz attempt. A quiz accepts exactly one submission.
pub fn submit_quiz(db: &Database, quiz_id: &str, answers: &[SubmittedAnswer]) -> Result<QuizSubmission> {
    let quiz = db.get_quiz(quiz_id)?;
    if quiz.completed_at.is_some() {
        return Err(MentoraError::AlreadyCompleted);
    }

    let report = grade_submission(&quiz.questions, answers);
    db.complete_quiz(quiz_id, &report.user_answers, report.score)?;
    info!(
        quiz_id,
        score = report.score,
        correct = report.correct_count,
        total = report.total_questions,
        "quiz submitted"
    );

    Ok(QuizSubmission {
        quiz_id: quiz.id,
        score: report.score,
        correct_count: report.correct_count,
        total_questions: report.total_questions,
        user_answers: report.user_answers,
    })
}

pub fn quiz_results(db: &Database, quiz_id: &str) -> Result<QuizResults> {
    let quiz: Quiz = db.get_quiz(quiz_id)?;
    if quiz.completed_at.is_none() {
        return Err(MentoraError::NotCompleted);
    }
    let results = question_results(&quiz);
    Ok(QuizResults {
        correct_count: results.iter().filter(|r| r.is_correct).count() as u32,
        results,
        quiz_id: quiz.id,
        title: quiz.title,
        document_id: quiz.document_id,
        score: quiz.score,
        total_questions: quiz.total_questions,
        completed_at: quiz.completed_at,
    })
}
