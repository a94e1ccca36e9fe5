//! Built-in tool set

use super::{ClickBehavior, MatchRule, Tool, ToolDefaults, ToolInteraction};
use pdf_annotation_model::{
    AnnotationSubtype, BlendMode, BorderStyle, Color, LineEnding, LineEndings, TextAlign,
    VerticalAlign,
};

pub const INTENT_INK_HIGHLIGHT: &str = "InkHighlight";
pub const INTENT_LINE_ARROW: &str = "LineArrow";

fn markup(id: &str, name: &str, subtype: AnnotationSubtype, color: Color) -> Tool {
    let interaction = ToolInteraction {
        cursor: None,
        text_selection: true,
        is_draggable: false,
        is_resizable: false,
        ..ToolInteraction::new(id)
    };
    Tool::new(id, name, subtype)
        .with_interaction(interaction)
        .with_defaults(ToolDefaults {
            color: Some(color),
            opacity: Some(1.0),
            ..Default::default()
        })
}

fn stroked_shape(id: &str, name: &str, subtype: AnnotationSubtype) -> Tool {
    Tool::new(id, name, subtype).with_defaults(ToolDefaults {
        color: Some(Color::TRANSPARENT),
        opacity: Some(1.0),
        stroke_width: Some(6.0),
        stroke_color: Some(Color::RED),
        stroke_style: Some(BorderStyle::Solid),
        ..Default::default()
    })
}

fn not_resizable(mut tool: Tool) -> Tool {
    tool.interaction.is_resizable = false;
    tool
}

/// Tools registered at plugin construction, in matching order
pub fn default_tools() -> Vec<Tool> {
    let mut highlight = markup("highlight", "Highlight", AnnotationSubtype::Highlight, Color::YELLOW);
    highlight.defaults.blend_mode = Some(BlendMode::Multiply);

    let ink = Tool::new("ink", "Pen", AnnotationSubtype::Ink)
        .with_match_rule(MatchRule::WithoutIntent(
            AnnotationSubtype::Ink,
            INTENT_INK_HIGHLIGHT.into(),
            5,
        ))
        .with_defaults(ToolDefaults {
            color: Some(Color::RED),
            opacity: Some(1.0),
            stroke_width: Some(6.0),
            ..Default::default()
        });

    let ink_highlighter = Tool::new("inkHighlighter", "Ink Highlighter", AnnotationSubtype::Ink)
        .with_match_rule(MatchRule::WithIntent(
            AnnotationSubtype::Ink,
            INTENT_INK_HIGHLIGHT.into(),
            10,
        ))
        .with_defaults(ToolDefaults {
            intent: Some(INTENT_INK_HIGHLIGHT.into()),
            color: Some(Color::YELLOW),
            opacity: Some(1.0),
            stroke_width: Some(14.0),
            blend_mode: Some(BlendMode::Multiply),
            ..Default::default()
        });

    let circle = stroked_shape("circle", "Circle", AnnotationSubtype::Circle)
        .with_click_behavior(ClickBehavior::sized(100.0, 100.0));
    let square = stroked_shape("square", "Square", AnnotationSubtype::Square)
        .with_click_behavior(ClickBehavior::sized(100.0, 100.0));

    let mut line = not_resizable(stroked_shape("line", "Line", AnnotationSubtype::Line))
        .with_match_rule(MatchRule::WithoutIntent(
            AnnotationSubtype::Line,
            INTENT_LINE_ARROW.into(),
            5,
        ))
        .with_click_behavior(ClickBehavior::line(100.0, 0.0));
    line.defaults.stroke_style = None;

    let mut line_arrow = line
        .clone()
        .with_match_rule(MatchRule::WithIntent(
            AnnotationSubtype::Line,
            INTENT_LINE_ARROW.into(),
            10,
        ));
    line_arrow.id = "lineArrow".into();
    line_arrow.name = "Arrow".into();
    line_arrow.interaction.mode = "lineArrow".into();
    line_arrow.defaults.intent = Some(INTENT_LINE_ARROW.into());
    line_arrow.defaults.line_endings = Some(LineEndings::new(LineEnding::None, LineEnding::OpenArrow));

    let mut polyline = not_resizable(stroked_shape("polyline", "Polyline", AnnotationSubtype::Polyline));
    polyline.defaults.stroke_style = None;
    let mut polygon = not_resizable(stroked_shape("polygon", "Polygon", AnnotationSubtype::Polygon));
    polygon.defaults.stroke_style = None;

    let free_text = Tool::new("freeText", "Free Text", AnnotationSubtype::FreeText)
        .with_defaults(ToolDefaults {
            contents: Some("Insert text".into()),
            font_size: Some(14.0),
            font_color: Some(Color::RED),
            font_family: Some("Helvetica".into()),
            text_align: Some(TextAlign::Left),
            vertical_align: Some(VerticalAlign::Top),
            background_color: Some(Color::TRANSPARENT),
            opacity: Some(1.0),
            ..Default::default()
        })
        .with_click_behavior(ClickBehavior {
            default_content: Some("Insert text".into()),
            ..ClickBehavior::sized(100.0, 20.0)
        });

    let mut stamp = Tool::new("stamp", "Image", AnnotationSubtype::Stamp);
    stamp.interaction.cursor = Some("copy".into());
    stamp.interaction.lock_aspect_ratio = true;

    vec![
        highlight,
        markup("underline", "Underline", AnnotationSubtype::Underline, Color::RED),
        markup("strikeout", "Strikeout", AnnotationSubtype::Strikeout, Color::RED),
        markup("squiggly", "Squiggly", AnnotationSubtype::Squiggly, Color::RED),
        ink,
        ink_highlighter,
        circle,
        square,
        line,
        line_arrow,
        polyline,
        polygon,
        free_text,
        stamp,
    ]
}
