use crate::model::{Priority, Subtask, Task, Template};

fn blueprint(id: &str, text: &str, priority: Priority, subtasks: &[(&str, &str)]) -> Task {
    Task {
        id: id.to_string(),
        text: text.to_string(),
        priority,
        completed: false,
        subtasks: subtasks
            .iter()
            .map(|(id, text)| Subtask {
                id: id.to_string(),
                text: text.to_string(),
                completed: false,
            })
            .collect(),
        expanded: false,
    }
}

/// Templates every new planner starts with.
pub fn builtin_templates() -> Vec<Template> {
    vec![
        Template {
            id: "work-day".to_string(),
            name: "Work Day".to_string(),
            icon: "🏢".to_string(),
            tasks: vec![
                blueprint(
                    "work-meeting",
                    "Meeting with manager",
                    Priority::High,
                    &[
                        ("prep-notes", "Prepare notes"),
                        ("review-agenda", "Review agenda"),
                    ],
                ),
                blueprint("work-email", "Check emails", Priority::Medium, &[]),
                blueprint("work-lunch", "Lunch break", Priority::Nutrition, &[]),
            ],
        },
        Template {
            id: "school-day".to_string(),
            name: "School Day".to_string(),
            icon: "🎓".to_string(),
            tasks: vec![
                blueprint(
                    "school-study",
                    "Study session",
                    Priority::Highest,
                    &[
                        ("read-chapter", "Read chapter 5"),
                        ("practice-problems", "Practice problems"),
                    ],
                ),
                blueprint("school-homework", "Complete homework", Priority::High, &[]),
            ],
        },
        Template {
            id: "free-day".to_string(),
            name: "Free Day".to_string(),
            icon: "🏠".to_string(),
            tasks: vec![
                blueprint("free-exercise", "Exercise", Priority::Medium, &[]),
                blueprint("free-relax", "Relaxation time", Priority::Medium, &[]),
            ],
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::builtin_templates;

    #[test]
    fn builtins_are_work_school_and_free_day() {
        let templates = builtin_templates();
        let names: Vec<_> = templates.iter().map(|t| t.name.as_str()).collect();

        assert_eq!(names, ["Work Day", "School Day", "Free Day"]);
        assert_eq!(templates[0].tasks.len(), 3);
        assert_eq!(templates[0].tasks[0].subtasks.len(), 2);
        assert!(
            templates
                .iter()
                .flat_map(|t| t.tasks.iter())
                .all(|task| !task.completed && !task.expanded)
        );
    }
}
