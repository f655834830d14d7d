//! 予測結果の表示用フォーマット
//!
//! 数値の丸めはここだけで行い、予測器の返す値には手を加えない。


use crate::orchestrator::OrchestrationState;
use crate::result::PredictionResult;
use std::fmt::Write;

/// エネルギー消費量の単位
pub const ENERGY_UNIT: &str = "kkal/kapita/hari";

/// 値が無い、または計算できない指標の表示
pub const NOT_APPLICABLE: &str = "N/A";

const MAX_FRACTION_DIGITS: usize = 3;

/// `id-ID` ロケールと同じ区切りで数値を整形する（千の位は `.`、小数点は `,`、小数は最大 3 桁）
pub fn format_number(value: f64) -> String {
    if !value.is_finite() {
        return NOT_APPLICABLE.to_string();
    }
    let scale = 10f64.powi(MAX_FRACTION_DIGITS as i32);
    let rounded = (value * scale).round() / scale;

    let text = format!("{:.*}", MAX_FRACTION_DIGITS, rounded.abs());
    let (integer, fraction) = text.split_once('.').unwrap_or((text.as_str(), ""));
    let fraction = fraction.trim_end_matches('0');

    let mut out = String::with_capacity(text.len() + integer.len() / 3 + 1);
    if rounded < 0.0 {
        out.push('-');
    }
    for (i, c) in integer.chars().enumerate() {
        if i > 0 && (integer.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(c);
    }
    if !fraction.is_empty() {
        out.push(',');
        out.push_str(fraction);
    }
    out
}

/// パーセント値を小数 3 桁で整形する
pub fn format_percent(value: f64) -> String {
    if !value.is_finite() {
        return NOT_APPLICABLE.to_string();
    }
    format!("{:.3}%", value)
}

/// 成長率を符号付きで整形する
pub fn format_growth(value: f64) -> String {
    if !value.is_finite() {
        return NOT_APPLICABLE.to_string();
    }
    format!("{:+.3}%", value)
}

/// 予測値に単位を付ける
pub fn format_energy(value: f64) -> String {
    format!("{} {}", format_number(value), ENERGY_UNIT)
}

/// 欠けている指標は `N/A`
pub fn or_na<T>(value: Option<T>, format: impl FnOnce(T) -> String) -> String {
    value.map(format).unwrap_or_else(|| NOT_APPLICABLE.to_string())
}

/// 予測結果の複数行サマリー
pub fn render_result(result: &PredictionResult) -> String {
    let mut out = String::new();
    // String への書き込みは失敗しない
    let _ = writeln!(out, "Region:     {}", result.region());
    let _ = writeln!(out, "Algorithm:  {}", result.algorithm());
    let _ = writeln!(
        out,
        "Forecast ({}): {}",
        result.period(),
        format_energy(result.predicted_value())
    );

    match result {
        PredictionResult::Regression(r) => {
            let _ = writeln!(
                out,
                "Accuracy:   {}",
                or_na(r.accuracy.map(|a| a.accuracy), format_percent)
            );
            let _ = writeln!(
                out,
                "Error:      {}",
                or_na(r.accuracy.map(|a| a.error), format_percent)
            );
            // 受信したフィールド名のまま表示する
            let _ = writeln!(
                out,
                "growth_penduduk:   {}",
                or_na(r.primary_growth, format_growth)
            );
            let _ = writeln!(
                out,
                "growth_pendapatan: {}",
                or_na(r.secondary_growth, format_growth)
            );
            if let Some((population, income)) = r.covariates {
                let _ = writeln!(
                    out,
                    "Covariates: {} / {}",
                    format_number(population),
                    format_number(income)
                );
            }
        }
        PredictionResult::Extrapolation(e) => {
            let _ = writeln!(out, "Growth:     {}", or_na(e.growth, format_growth));
        }
    }

    let plot = result
        .plot()
        .map(|p| format!("{} bytes", p.len()))
        .unwrap_or_else(|| NOT_APPLICABLE.to_string());
    let _ = writeln!(out, "Plot:       {}", plot);
    out
}

/// オーケストレーターの状態を 1 画面分に整形する
pub fn render_state(state: &OrchestrationState) -> String {
    match state {
        OrchestrationState::Idle => "Select a region and an algorithm\n".to_string(),
        OrchestrationState::Validating(request) | OrchestrationState::InFlight(request) => {
            format!(
                "Predicting {} with {}...\n",
                request.region, request.algorithm
            )
        }
        OrchestrationState::Succeeded(result) => render_result(result),
        OrchestrationState::Failed(error) => format!("Prediction failed: {}\n", error),
    }
}
