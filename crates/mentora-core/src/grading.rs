use crate::db::models::{Quiz, QuizQuestion, ResolvedAnswer, SubmittedAnswer};
use crate::resolver::{resolve_index, AnswerValue, ResolvedIndex};
use serde::Serialize;
use std::collections::HashSet;

#[derive(Debug, Clone, Serialize)]
pub struct GradeReport {
    pub user_answers: Vec<ResolvedAnswer>,
    pub correct_count: u32,
    pub total_questions: u32,
    pub score: u32,
}

/// Per-question view of a graded quiz.
#[derive(Debug, Clone, Serialize)]
pub struct QuestionResult {
    pub question_index: usize,
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: AnswerValue,
    pub correct_index: ResolvedIndex,
    pub selected_answer: Option<AnswerValue>,
    pub selected_index: ResolvedIndex,
    pub is_correct: bool,
    pub explanation: String,
}

/// Rounded integer percentage; 0 for an empty quiz.
pub fn percentage(correct: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    (correct as f64 / total as f64 * 100.0).round() as u32
}

/// Canonical index of the question's correct option, resolving answers
/// stored before the index was recorded.
fn correct_index(question: &QuizQuestion) -> Option<usize> {
    question
        .correct_index
        .get()
        .or_else(|| resolve_index(&question.correct_answer, &question.options))
}

/// Same option on both sides, or raw equality when either side is unresolvable.
pub fn is_correct(selected: &AnswerValue, selected_index: Option<usize>, question: &QuizQuestion) -> bool {
    match (selected_index, correct_index(question)) {
        (Some(chosen), Some(correct)) => chosen == correct,
        _ => *selected == question.correct_answer,
    }
}

/// Grade one submission. Answers pointing at a missing question, and repeat
/// answers for a question already graded, are skipped.
pub fn grade_submission(questions: &[QuizQuestion], answers: &[SubmittedAnswer]) -> GradeReport {
    let answered_at = chrono::Utc::now().to_rfc3339();
    let mut seen = HashSet::new();
    let mut user_answers = Vec::with_capacity(answers.len());

    for answer in answers {
        let Ok(question_index) = usize::try_from(answer.question_index) else {
            continue;
        };
        let Some(question) = questions.get(question_index) else {
            continue;
        };
        if !seen.insert(question_index) {
            continue;
        }

        let selected_index = resolve_index(&answer.selected_answer, &question.options);
        user_answers.push(ResolvedAnswer {
            question_index,
            selected_answer: answer.selected_answer.clone(),
            selected_index: selected_index.into(),
            is_correct: is_correct(&answer.selected_answer, selected_index, question),
            answered_at: answered_at.clone(),
        });
    }

    let correct_count = user_answers.iter().filter(|a| a.is_correct).count() as u32;
    let total_questions = questions.len() as u32;
    GradeReport {
        score: percentage(correct_count, total_questions),
        user_answers,
        correct_count,
        total_questions,
    }
}

pub fn question_results(quiz: &Quiz) -> Vec<QuestionResult> {
    quiz.questions
        .iter()
        .enumerate()
        .map(|(index, question)| {
            let answer = quiz.user_answers.iter().find(|a| a.question_index == index);
            let selected_index = answer
                .and_then(|a| resolve_index(&a.selected_answer, &question.options));
            QuestionResult {
                question_index: index,
                question: question.question.clone(),
                options: question.options.clone(),
                correct_answer: question.correct_answer.clone(),
                correct_index: correct_index(question).into(),
                selected_answer: answer.map(|a| a.selected_answer.clone()),
                selected_index: selected_index.into(),
                is_correct: answer.is_some_and(|a| a.is_correct),
                explanation: question.explanation.clone(),
            }
        })
        .collect()
}
