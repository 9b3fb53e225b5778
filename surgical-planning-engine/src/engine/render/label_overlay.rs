use crate::tools::labels::{LabelLayout, LabelTarget};
use crate::tools::registry::ObjectRegistry;
use bevy::prelude::*;
use constants::render_settings::{
    LABEL_BACKGROUND, LABEL_CLOSE_SIZE, LABEL_FONT_SIZE, LABEL_HEIGHT, LABEL_TEXT_COLOUR,
    LABEL_WIDTH,
};
use std::collections::HashMap;

/// UI panel showing one measurement or annotation label.
#[derive(Component, Debug)]
pub struct LabelNode {
    pub target: LabelTarget,
    text: Entity,
}

fn label_text(registry: &ObjectRegistry, target: LabelTarget) -> Option<String> {
    match target {
        LabelTarget::Measurement(id) => registry.measurement(id).map(|m| m.display_value()),
        LabelTarget::Annotation(id) => registry.annotation(id).map(|a| a.title()),
    }
}

fn spawn_label(commands: &mut Commands, target: LabelTarget, text: String) {
    let text_entity = commands
        .spawn((
            Text::new(text),
            TextFont {
                font_size: LABEL_FONT_SIZE,
                ..default()
            },
            TextColor(LABEL_TEXT_COLOUR),
        ))
        .id();

    let mut label = commands.spawn((
        Node {
            position_type: PositionType::Absolute,
            width: Val::Px(LABEL_WIDTH),
            height: Val::Px(LABEL_HEIGHT),
            justify_content: JustifyContent::Center,
            align_items: AlignItems::Center,
            ..default()
        },
        BackgroundColor(LABEL_BACKGROUND),
        BorderRadius::all(Val::Px(4.0)),
        Visibility::Hidden,
        LabelNode {
            target,
            text: text_entity,
        },
    ));
    label.add_child(text_entity);

    // Close box, matched by `close_rect` in the pointer hit test.
    if matches!(target, LabelTarget::Measurement(_)) {
        label.with_child((
            Text::new("×"),
            TextFont {
                font_size: LABEL_CLOSE_SIZE,
                ..default()
            },
            TextColor(LABEL_TEXT_COLOUR),
            Node {
                position_type: PositionType::Absolute,
                top: Val::Px(0.0),
                right: Val::Px(0.0),
                width: Val::Px(LABEL_CLOSE_SIZE),
                height: Val::Px(LABEL_CLOSE_SIZE),
                ..default()
            },
        ));
    }
}

/// Create, retitle and remove label panels as the registry changes.
pub fn sync_label_nodes(
    mut commands: Commands,
    registry: Res<ObjectRegistry>,
    labels: Query<(Entity, &LabelNode)>,
    mut texts: Query<&mut Text>,
) {
    if !registry.is_changed() {
        return;
    }

    let mut existing: HashMap<LabelTarget, Entity> = HashMap::new();
    for (entity, label) in &labels {
        match label_text(&registry, label.target) {
            Some(content) => {
                if let Ok(mut text) = texts.get_mut(label.text) {
                    if text.0 != content {
                        text.0 = content;
                    }
                }
                existing.insert(label.target, entity);
            }
            None => commands.entity(entity).despawn(),
        }
    }

    for (target, _) in registry.labels() {
        if existing.contains_key(&target) {
            continue;
        }
        if let Some(content) = label_text(&registry, target) {
            spawn_label(&mut commands, target, content);
        }
    }
}

/// Pin every panel to its projected position, hiding those behind the camera.
pub fn position_label_nodes(
    layout: Res<LabelLayout>,
    mut labels: Query<(&LabelNode, &mut Node, &mut Visibility)>,
) {
    for (label, mut node, mut visibility) in &mut labels {
        match layout.position(label.target) {
            Some(centre) => {
                node.left = Val::Px(centre.x - LABEL_WIDTH * 0.5);
                node.top = Val::Px(centre.y - LABEL_HEIGHT * 0.5);
                *visibility = Visibility::Inherited;
            }
            None => *visibility = Visibility::Hidden,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::registry::MarkStyle;

    fn test_app() -> App {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins);
        app.init_resource::<ObjectRegistry>()
            .add_systems(Update, sync_label_nodes);
        app
    }

    fn label_count(app: &mut App) -> usize {
        let world = app.world_mut();
        world.query::<&LabelNode>().iter(world).count()
    }

    #[test]
    fn panels_follow_registry_contents() {
        let mut app = test_app();
        let id = app.world_mut().resource_mut::<ObjectRegistry>().add_annotation(
            Vec3::ZERO,
            0.01,
            MarkStyle::new([1.0; 3], 1.0),
        );

        app.update();
        assert_eq!(label_count(&mut app), 1);

        app.world_mut()
            .resource_mut::<ObjectRegistry>()
            .set_annotation_note(id, "osteotomy");
        app.update();
        let world = app.world_mut();
        let texts: Vec<String> = world
            .query::<&Text>()
            .iter(world)
            .map(|text| text.0.clone())
            .collect();
        assert_eq!(texts, ["#1 osteotomy"]);

        app.world_mut()
            .resource_mut::<ObjectRegistry>()
            .remove_annotation(id);
        app.update();
        assert_eq!(label_count(&mut app), 0);
    }
}
