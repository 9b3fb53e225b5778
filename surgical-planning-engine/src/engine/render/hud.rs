use crate::tools::tool_manager::ToolManager;
use bevy::prelude::*;
use constants::render_settings::{HUD_FONT_SIZE, LABEL_BACKGROUND, LABEL_TEXT_COLOUR};

#[derive(Component)]
pub struct ToolHintText;

/// Last distance or angle, shown only while a measuring tool is active.
#[derive(Component)]
pub struct MeasurementReadout;

pub fn spawn_hud(commands: &mut Commands) {
    commands
        .spawn(Node {
            width: Val::Percent(100.0),
            height: Val::Percent(100.0),
            ..default()
        })
        .with_children(|parent| {
            parent.spawn((
                Text::new(""),
                TextFont {
                    font_size: HUD_FONT_SIZE,
                    ..default()
                },
                TextColor(LABEL_TEXT_COLOUR),
                Node {
                    position_type: PositionType::Absolute,
                    top: Val::Px(12.0),
                    left: Val::Px(12.0),
                    ..default()
                },
                ToolHintText,
            ));
            parent.spawn((
                Text::new(""),
                TextFont {
                    font_size: HUD_FONT_SIZE * 1.4,
                    ..default()
                },
                TextColor(LABEL_TEXT_COLOUR),
                BackgroundColor(LABEL_BACKGROUND),
                Node {
                    position_type: PositionType::Absolute,
                    bottom: Val::Px(12.0),
                    left: Val::Px(12.0),
                    padding: UiRect::axes(Val::Px(10.0), Val::Px(6.0)),
                    ..default()
                },
                Visibility::Hidden,
                MeasurementReadout,
            ));
        });
}

pub fn update_hud(
    tool_manager: Res<ToolManager>,
    mut hint_query: Query<&mut Text, (With<ToolHintText>, Without<MeasurementReadout>)>,
    mut readout_query: Query<(&mut Text, &mut Visibility), With<MeasurementReadout>>,
) {
    if !tool_manager.is_changed() {
        return;
    }
    let tool = tool_manager.active_tool();

    for mut text in &mut hint_query {
        text.0 = format!("{}: {}", tool.title(), tool.hint());
    }

    for (mut text, mut visibility) in &mut readout_query {
        match tool_manager.readout() {
            Some(readout) if tool_manager.readout_visible() => {
                text.0 = readout.to_string();
                *visibility = Visibility::Inherited;
            }
            _ => *visibility = Visibility::Hidden,
        }
    }
}
