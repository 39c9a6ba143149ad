//! Plain-text rendering of transcript messages.

use std::fmt::Write as _;

use planner_stream::message::{AgentTurn, Message};
use planner_stream::payload::{AgentPayload, Course, CourseList, Plan, ShortTermPlan};

pub fn message(message: &Message) -> String {
    let mut out = String::new();
    match message {
        Message::UserTurn { text } => {
            let _ = writeln!(out, "> {text}");
        }
        Message::AgentTurn(turn) => agent_turn(&mut out, turn),
    }
    out
}

fn agent_turn(out: &mut String, turn: &AgentTurn) {
    match turn.view() {
        AgentPayload::Plans(plans) => {
            for plan in &plans {
                render_plan(out, plan);
            }
        }
        AgentPayload::ShortTermPlan(plan) => render_short_term(out, &plan),
        AgentPayload::Greeting(text) => {
            let _ = writeln!(out, "{text}");
        }
        AgentPayload::CourseList(list) => render_course_list(out, &list),
        AgentPayload::Raw(value) => {
            let _ = writeln!(out, "[{}] {value}", turn.kind);
        }
    }
}

fn render_plan(out: &mut String, plan: &Plan) {
    let _ = write!(out, "Plan");
    if let Some(number) = &plan.plan_number {
        let _ = write!(out, " {number}");
    }
    let _ = writeln!(out);
    if let Some(semesters) = &plan.total_semesters {
        let _ = writeln!(out, "  Total semesters: {semesters}");
    }
    if let Some(credits) = &plan.total_credits {
        let _ = writeln!(out, "  Total credits: {credits}");
    }
    for semester in &plan.semester_schedule {
        let _ = write!(out, "  Semester");
        if let Some(number) = &semester.semester {
            let _ = write!(out, " {number}");
        }
        if let Some(credits) = &semester.total_credits {
            let _ = write!(out, " ({credits} credits)");
        }
        let _ = writeln!(out);
        for course in &semester.courses {
            let _ = writeln!(out, "    - {}", course_heading(course));
        }
    }
    if let Some(reason) = &plan.reason_behind_planning {
        let _ = writeln!(out, "  {reason}");
    }
}

fn render_short_term(out: &mut String, plan: &ShortTermPlan) {
    let _ = writeln!(out, "Suggested courses");
    for course in &plan.suggestions {
        let _ = writeln!(out, "  - {}", course_heading(course));
        if let Some(reason) = &course.reason {
            let _ = writeln!(out, "    {reason}");
        }
    }
    if let Some(explanation) = &plan.explanation {
        let _ = writeln!(out, "  {explanation}");
    }
}

fn render_course_list(out: &mut String, list: &CourseList) {
    let _ = writeln!(out, "Matched courses");
    for course in &list.matched_courses {
        let _ = writeln!(out, "  - {}", course_heading(course));
        if let Some(description) = &course.description {
            let _ = writeln!(out, "    {description}");
        }
    }
    if let Some(reason) = &list.reason {
        let _ = writeln!(out, "  {reason}");
    }
}

fn course_heading(course: &Course) -> String {
    let mut heading = match (&course.course_number, &course.title) {
        (Some(number), Some(title)) => format!("{number} - {title}"),
        (Some(number), None) => number.clone(),
        (None, Some(title)) => title.clone(),
        (None, None) => "(untitled course)".to_string(),
    };
    if let Some(credits) = &course.credit_hours {
        let _ = write!(heading, " [{credits} cr]");
    }
    heading
}
