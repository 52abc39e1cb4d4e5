use crate::models::allocations::entities::SETTINGS_SUBJECT_ID;

// 评语与复核说明的最大长度（字符）
pub const MAX_FEEDBACK_CHARS: usize = 10_000;
pub const MAX_COMMENT_CHARS: usize = 2_000;

/// 分配请求校验结果
#[derive(Debug, Clone)]
pub struct AllocationValidationResult {
    pub is_valid: bool,
    pub errors: Vec<&'static str>,
}

impl AllocationValidationResult {
    pub fn error_message(&self) -> String {
        self.errors.join("; ")
    }
}

/// 校验分配请求的结构约束
///
/// 评分人是否存在、是否具备评分能力由服务层查询后判断。
pub fn validate_allocation(
    subject_id: i64,
    marker1_id: i64,
    marker2_id: i64,
) -> AllocationValidationResult {
    let mut errors = Vec::new();

    // 1. subject_id = 0 保留给作业级设置行
    if subject_id <= SETTINGS_SUBJECT_ID {
        errors.push("Subject id must be a positive user id");
    }

    // 2. 评分人 ID 必须有效
    if marker1_id <= 0 || marker2_id <= 0 {
        errors.push("Marker ids must be positive user ids");
    }

    // 3. 两个评分人必须不同
    if marker1_id == marker2_id {
        errors.push("Marker 1 and marker 2 must be different users");
    }

    // 4. 学生不能给自己评分
    if subject_id == marker1_id || subject_id == marker2_id {
        errors.push("A student cannot mark their own submission");
    }

    AllocationValidationResult {
        is_valid: errors.is_empty(),
        errors,
    }
}

/// 成绩必须是有限数且落在 [0, max_score]
pub fn validate_grade(grade: f64, max_score: f64) -> Result<(), String> {
    if !grade.is_finite() {
        return Err("Grade must be a finite number".to_string());
    }
    if grade < 0.0 || grade > max_score {
        return Err(format!("Grade must be between 0 and {max_score}"));
    }
    Ok(())
}

pub fn validate_feedback(feedback: &str) -> Result<(), &'static str> {
    if feedback.chars().count() > MAX_FEEDBACK_CHARS {
        return Err("Feedback is too long");
    }
    Ok(())
}

pub fn validate_comment(comment: &str) -> Result<(), &'static str> {
    if comment.chars().count() > MAX_COMMENT_CHARS {
        return Err("Ratification comment is too long");
    }
    Ok(())
}
