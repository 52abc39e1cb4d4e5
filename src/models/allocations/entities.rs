use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::errors::{DoubleMarkingError, Result};

/// 作业级设置行使用的 subject_id
pub const SETTINGS_SUBJECT_ID: i64 = 0;

// 盲评设置
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, PartialOrd, Ord, Default, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "../frontend/src/types/generated/marking.ts")]
pub enum BlindSetting {
    #[default]
    None, // 不盲评
    Blind,       // 评分人互相不可见
    DoubleBlind, // 评分人互相不可见，且学生身份对评分人隐藏
}

impl BlindSetting {
    pub fn as_i32(&self) -> i32 {
        match self {
            BlindSetting::None => 0,
            BlindSetting::Blind => 1,
            BlindSetting::DoubleBlind => 2,
        }
    }

    /// 是否隐藏评分人身份（BLIND 与 DOUBLE_BLIND 都会）
    pub fn hides_markers(&self) -> bool {
        self.as_i32() > 0
    }
}

impl TryFrom<i32> for BlindSetting {
    type Error = DoubleMarkingError;

    fn try_from(value: i32) -> Result<Self> {
        match value {
            0 => Ok(BlindSetting::None),
            1 => Ok(BlindSetting::Blind),
            2 => Ok(BlindSetting::DoubleBlind),
            _ => Err(DoubleMarkingError::validation(format!(
                "无效的盲评设置: {value}. 支持: 0, 1, 2"
            ))),
        }
    }
}

// 同时接受名称 ("blind") 与宿主平台使用的整数 (1)
impl<'de> Deserialize<'de> for BlindSetting {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::{Error, Unexpected, Visitor};

        struct BlindSettingVisitor;

        impl Visitor<'_> for BlindSettingVisitor {
            type Value = BlindSetting;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                formatter.write_str("0, 1, 2 or one of none, blind, double_blind")
            }

            fn visit_i64<E: Error>(self, value: i64) -> std::result::Result<Self::Value, E> {
                i32::try_from(value)
                    .ok()
                    .and_then(|v| BlindSetting::try_from(v).ok())
                    .ok_or_else(|| Error::invalid_value(Unexpected::Signed(value), &self))
            }

            fn visit_u64<E: Error>(self, value: u64) -> std::result::Result<Self::Value, E> {
                i32::try_from(value)
                    .ok()
                    .and_then(|v| BlindSetting::try_from(v).ok())
                    .ok_or_else(|| Error::invalid_value(Unexpected::Unsigned(value), &self))
            }

            fn visit_str<E: Error>(self, value: &str) -> std::result::Result<Self::Value, E> {
                value.parse().map_err(Error::custom)
            }
        }

        deserializer.deserialize_any(BlindSettingVisitor)
    }
}

impl std::fmt::Display for BlindSetting {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BlindSetting::None => write!(f, "none"),
            BlindSetting::Blind => write!(f, "blind"),
            BlindSetting::DoubleBlind => write!(f, "double_blind"),
        }
    }
}

impl std::str::FromStr for BlindSetting {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "none" => Ok(BlindSetting::None),
            "blind" => Ok(BlindSetting::Blind),
            "double_blind" => Ok(BlindSetting::DoubleBlind),
            _ => Err(format!(
                "无效的盲评设置: '{s}'. 支持的设置: none, blind, double_blind"
            )),
        }
    }
}

/// 两个评分位
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "../frontend/src/types/generated/marking.ts")]
pub enum MarkerSlot {
    Marker1,
    Marker2,
}

impl std::fmt::Display for MarkerSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MarkerSlot::Marker1 => write!(f, "marker1"),
            MarkerSlot::Marker2 => write!(f, "marker2"),
        }
    }
}

/// 复核定分来源
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "../frontend/src/types/generated/marking.ts")]
pub enum RatificationChoice {
    Marker1, // 采用第一评分人成绩
    Marker2, // 采用第二评分人成绩
    Average, // 取两者平均
    Custom,  // 复核人自定义成绩
}

impl std::fmt::Display for RatificationChoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RatificationChoice::Marker1 => write!(f, "marker1"),
            RatificationChoice::Marker2 => write!(f, "marker2"),
            RatificationChoice::Average => write!(f, "average"),
            RatificationChoice::Custom => write!(f, "custom"),
        }
    }
}

impl std::str::FromStr for RatificationChoice {
    type Err = DoubleMarkingError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "marker1" => Ok(RatificationChoice::Marker1),
            "marker2" => Ok(RatificationChoice::Marker2),
            "average" => Ok(RatificationChoice::Average),
            "custom" => Ok(RatificationChoice::Custom),
            _ => Err(DoubleMarkingError::invalid_choice(format!(
                "无效的定分方式: '{s}'. 支持: marker1, marker2, average, custom"
            ))),
        }
    }
}

/// 作业级双评设置
///
/// 没有设置行时由系统默认值构造，分差阈值始终来自系统配置。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/marking.ts")]
pub struct MarkingSettings {
    pub blind_setting: BlindSetting,
    pub marks_hidden: bool,
    pub grade_difference_threshold: f64,
}

impl MarkingSettings {
    /// 从系统配置构造默认设置，无效的默认盲评设置直接报错
    pub fn from_defaults(config: &crate::config::MarkingConfig) -> Result<Self> {
        Ok(Self {
            blind_setting: BlindSetting::try_from(config.default_blind_setting)?,
            marks_hidden: config.default_marks_hidden,
            grade_difference_threshold: config.grade_difference_threshold,
        })
    }

    /// 用作业级设置行覆盖默认值
    pub fn with_assignment_row(mut self, row: Option<&Allocation>) -> Self {
        if let Some(row) = row {
            self.blind_setting = row.blind_setting;
            self.marks_hidden = row.marks_hidden;
        }
        self
    }
}

/// 评分阶段
///
/// 完全由成绩字段推导，从不落库。
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "../frontend/src/types/generated/marking.ts")]
pub enum GradingPhase {
    AwaitingMarker1,
    AwaitingMarker2,
    BothGraded,
    Ratified,
}

// 双评分配实体
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/marking.ts")]
pub struct Allocation {
    pub id: i64,
    pub assignment_id: i64,
    // 0 表示作业级设置行
    pub subject_id: i64,
    pub marker1_id: Option<i64>,
    pub marker2_id: Option<i64>,
    pub ratifier_id: Option<i64>,
    pub marker1_grade: Option<f64>,
    pub marker2_grade: Option<f64>,
    pub marker1_graded_at: Option<chrono::DateTime<chrono::Utc>>,
    pub marker2_graded_at: Option<chrono::DateTime<chrono::Utc>>,
    pub marker1_feedback: Option<String>,
    pub marker2_feedback: Option<String>,
    pub final_grade: Option<f64>,
    pub ratification_comment: Option<String>,
    pub ratified_at: Option<chrono::DateTime<chrono::Utc>>,
    pub blind_setting: BlindSetting,
    pub marks_hidden: bool,
    // 行版本号，用于条件更新
    pub version: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl Allocation {
    pub fn is_settings_row(&self) -> bool {
        self.subject_id == SETTINGS_SUBJECT_ID
    }

    pub fn is_ratified(&self) -> bool {
        self.final_grade.is_some()
    }

    /// 推导当前评分阶段
    pub fn phase(&self) -> GradingPhase {
        if self.is_ratified() {
            return GradingPhase::Ratified;
        }
        match (self.marker1_grade, self.marker2_grade) {
            (None, _) => GradingPhase::AwaitingMarker1,
            (Some(_), None) => GradingPhase::AwaitingMarker2,
            (Some(_), Some(_)) => GradingPhase::BothGraded,
        }
    }

    /// 指定用户占据的评分位
    pub fn slot_of(&self, user_id: i64) -> Option<MarkerSlot> {
        if self.marker1_id == Some(user_id) {
            Some(MarkerSlot::Marker1)
        } else if self.marker2_id == Some(user_id) {
            Some(MarkerSlot::Marker2)
        } else {
            None
        }
    }

    pub fn grade_of(&self, slot: MarkerSlot) -> Option<f64> {
        match slot {
            MarkerSlot::Marker1 => self.marker1_grade,
            MarkerSlot::Marker2 => self.marker2_grade,
        }
    }
}
