// ==========================================
// 租赁订单装箱标签系统 - 标签显示设置
// ==========================================
// 只描述渲染层需要的显示开关与尺寸参数
// 版式计算属于渲染层,不在此处
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontSize {
    Small,
    Medium,
    Large,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LabelPresetKey {
    FlightcaseSmall,
    FlightcaseLarge,
    #[serde(rename = "thermal-4x6")]
    Thermal4x6,
    ThermalReceipt,
    Custom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelOrientation {
    Portrait,
    Landscape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LabelMode {
    Label,
    ThermalReceipt,
}

// ==========================================
// LabelSettings - 标签显示设置
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LabelSettings {
    pub show_logo: bool,
    pub company_name: String,
    pub show_barcode: bool,
    pub show_contents: bool,
    pub show_dates: bool,
    pub show_notes: bool,
    pub show_venue: bool,
    pub show_weight: bool,
    pub font_size: FontSize,
    pub label_width: u32,  // mm
    pub label_height: u32, // mm
    pub accent_color: String,
    pub label_preset: LabelPresetKey,
    pub orientation: LabelOrientation,
    pub label_mode: LabelMode,
    pub thermal_receipt_width: u32, // mm
}

impl Default for LabelSettings {
    fn default() -> Self {
        Self {
            show_logo: true,
            company_name: "RENTAL CO.".to_string(),
            show_barcode: true,
            show_contents: true,
            show_dates: true,
            show_notes: true,
            show_venue: true,
            show_weight: true,
            font_size: FontSize::Medium,
            label_width: 127,
            label_height: 178,
            accent_color: "amber".to_string(),
            label_preset: LabelPresetKey::FlightcaseSmall,
            orientation: LabelOrientation::Portrait,
            label_mode: LabelMode::Label,
            thermal_receipt_width: 80,
        }
    }
}

impl LabelSettings {
    /// 以指定公司名构造默认设置
    pub fn with_company_name(company_name: impl Into<String>) -> Self {
        Self {
            company_name: company_name.into(),
            ..Self::default()
        }
    }
}

// ==========================================
// LabelPreset - 用户保存的显示预设
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelPreset {
    pub preset_id: String,
    pub user_id: String,
    pub name: String,
    pub settings: LabelSettings,
    pub logo_url: Option<String>,
    pub is_default: bool,
    pub updated_at: NaiveDateTime,
}
