//! InspectionReport -> DocumentTree.

use crate::{
    model::{InspectionReport, Regulation, Violation},
    text::clean,
    tree::DocumentTree,
};
use serde::Serialize;

/// Every fixed string the builder emits. `en` is the default; `zh` is the
/// wording used on Chinese-language site reports.
#[derive(Debug, Clone, Serialize)]
pub struct Labels {
    pub title: &'static str,
    pub basic_info: &'static str,
    pub inspection_time: &'static str,
    pub location: &'static str,
    pub inspector: &'static str,
    pub report_id: &'static str,
    pub unknown_location: &'static str,
    pub default_inspector: &'static str,
    pub score: &'static str,
    pub score_line: &'static str,
    pub statistics: &'static str,
    pub counts_line: &'static str,
    pub col_index: &'static str,
    pub col_type: &'static str,
    pub col_severity: &'static str,
    pub col_risk: &'static str,
    pub no_violations: &'static str,
    pub details: &'static str,
    pub violation_heading: &'static str,
    pub description: &'static str,
    pub regulations: &'static str,
    pub regulation_line: &'static str,
    pub suggestions: &'static str,
    pub assessment: &'static str,
    pub no_assessment: &'static str,
    pub priority_actions: &'static str,
    pub no_priority_actions: &'static str,
    pub disclaimer: &'static str,
    pub unknown: &'static str,
    pub unknown_category: &'static str,
    pub no_description: &'static str,
}

impl Labels {
    pub fn english() -> Self {
        Self {
            title: "Building Safety Inspection Report",
            basic_info: "Basic information",
            inspection_time: "Inspection time",
            location: "Location",
            inspector: "Inspector",
            report_id: "Report ID",
            unknown_location: "unknown",
            default_inspector: "AI system",
            score: "Safety score",
            score_line: "Overall safety score: {score}/100",
            statistics: "Violation statistics",
            counts_line: "Severe: {severe}, general: {normal}, total: {total}",
            col_index: "No.",
            col_type: "Type",
            col_severity: "Severity",
            col_risk: "Risk level",
            no_violations: "No violations found",
            details: "Violation details",
            violation_heading: "Violation {index}: {category}",
            description: "Description: {description}",
            regulations: "Regulations violated",
            regulation_line: "{code} Article {article}: {content}",
            suggestions: "Rectification suggestions",
            assessment: "Overall assessment",
            no_assessment: "No assessment available",
            priority_actions: "Priority actions",
            no_priority_actions: "No priority actions",
            disclaimer: "This report was generated automatically by an AI system and is for reference only.",
            unknown: "unknown",
            unknown_category: "unknown category",
            no_description: "no description",
        }
    }

    pub fn chinese() -> Self {
        Self {
            title: "建筑安全与质量检测报告",
            basic_info: "基本信息",
            inspection_time: "检测时间",
            location: "检测地点",
            inspector: "检测人员",
            report_id: "报告编号",
            unknown_location: "未知",
            default_inspector: "AI系统",
            score: "安全评分",
            score_line: "整体安全评分：{score}/100",
            statistics: "违规统计",
            counts_line: "严重违规：{severe}，一般违规：{normal}，总违规数：{total}",
            col_index: "序号",
            col_type: "违规类型",
            col_severity: "严重程度",
            col_risk: "风险等级",
            no_violations: "未发现明显违规行为",
            details: "详细违规信息",
            violation_heading: "违规 {index}: {category}",
            description: "违规行为：{description}",
            regulations: "违反规范",
            regulation_line: "{code} 第{article}条：{content}",
            suggestions: "整改建议",
            assessment: "整体安全评估",
            no_assessment: "无评估",
            priority_actions: "优先整改事项",
            no_priority_actions: "暂无优先整改事项",
            disclaimer: "本报告由AI系统自动生成，仅供参考",
            unknown: "未知",
            unknown_category: "未知类别",
            no_description: "无描述",
        }
    }

    /// Unknown codes fall back to English.
    pub fn for_language(code: &str) -> Self {
        match code.trim().to_ascii_lowercase().as_str() {
            "zh" | "zh-cn" | "zh_cn" | "cn" => Self::chinese(),
            _ => Self::english(),
        }
    }
}

impl Default for Labels {
    fn default() -> Self {
        Self::english()
    }
}

pub fn build(report: &InspectionReport) -> DocumentTree {
    build_with(report, &Labels::english())
}

pub fn build_with(report: &InspectionReport, labels: &Labels) -> DocumentTree {
    let mut doc = DocumentTree::new();

    doc.heading(0, labels.title);
    doc.heading(1, labels.basic_info);
    doc.table(
        Vec::new(),
        vec![
            row([labels.inspection_time.into(), clean(&report.timestamp)]),
            row([
                labels.location.into(),
                or_label(report.location.as_deref(), labels.unknown_location),
            ]),
            row([
                labels.inspector.into(),
                or_label(report.inspector.as_deref(), labels.default_inspector),
            ]),
            row([labels.report_id.into(), clean(&report.report_id)]),
        ],
    );

    let summary = &report.summary;
    doc.heading(1, labels.score);
    let score = clean(&summary.total_score.to_string());
    doc.paragraph(fill(labels.score_line, &[("score", &score)]));

    doc.heading(1, labels.statistics);
    doc.paragraph(fill(
        labels.counts_line,
        &[
            ("severe", &summary.severe_count.to_string()),
            ("normal", &summary.normal_count.to_string()),
            ("total", &summary.total_count().to_string()),
        ],
    ));

    if report.violations.is_empty() {
        doc.paragraph(labels.no_violations);
    } else {
        let header = vec![
            labels.col_index.to_string(),
            labels.col_type.to_string(),
            labels.col_severity.to_string(),
            labels.col_risk.to_string(),
        ];
        let rows = report
            .violations
            .iter()
            .enumerate()
            .map(|(i, v)| {
                vec![
                    (i + 1).to_string(),
                    or_label(v.kind.as_deref(), labels.unknown),
                    or_label(v.severity.as_deref(), labels.unknown),
                    or_label(v.risk_level.as_deref(), labels.unknown),
                ]
            })
            .collect();
        doc.table(header, rows);

        doc.heading(1, labels.details);
        for (i, v) in report.violations.iter().enumerate() {
            push_violation(&mut doc, labels, i + 1, v);
        }
    }

    doc.heading(1, labels.assessment);
    doc.paragraph(or_label(
        summary.overall_assessment.as_deref(),
        labels.no_assessment,
    ));

    doc.heading(1, labels.priority_actions);
    if summary.priority_actions.is_empty() {
        doc.paragraph(labels.no_priority_actions);
    } else {
        doc.bullets(summary.priority_actions.iter().map(|a| clean(a)).collect());
    }

    doc.paragraph(labels.disclaimer);
    doc
}

fn push_violation(doc: &mut DocumentTree, labels: &Labels, index: usize, v: &Violation) {
    let category = or_label(v.category.as_deref(), labels.unknown_category);
    doc.heading(
        2,
        fill(
            labels.violation_heading,
            &[("index", &index.to_string()), ("category", &category)],
        ),
    );

    let description = or_label(v.description.as_deref(), labels.no_description);
    doc.paragraph(fill(labels.description, &[("description", &description)]));

    if !v.regulations.is_empty() {
        doc.heading(3, labels.regulations);
        doc.bullets(
            v.regulations
                .iter()
                .map(|r| regulation_line(labels, r))
                .collect(),
        );
    }

    if !v.suggestions.is_empty() {
        doc.heading(3, labels.suggestions);
        doc.bullets(v.suggestions.iter().map(|s| clean(s)).collect());
    }
}

fn regulation_line(labels: &Labels, r: &Regulation) -> String {
    fill(
        labels.regulation_line,
        &[
            ("code", &clean(&r.code)),
            ("article", &clean(&r.article)),
            ("content", &clean(&r.content)),
        ],
    )
}

fn or_label(value: Option<&str>, fallback: &str) -> String {
    value.map(clean).unwrap_or_else(|| fallback.to_string())
}

fn row<const N: usize>(cells: [String; N]) -> Vec<String> {
    cells.into()
}

/// Replaces `{name}` placeholders in a label template in a single pass, so
/// braces inside substituted values are never expanded.
fn fill(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let value = after.find('}').and_then(|close| {
            let name = &after[..close];
            vars.iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| (*v, close))
        });
        match value {
            Some((v, close)) => {
                out.push_str(v);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}
