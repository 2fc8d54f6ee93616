use crate::camera::{MapCamera, camera_scale};
use crate::common::{WagonId, map_rotation, map_to_world, world_to_map};
use crate::level::ShuntingSettings;
use crate::simulation::dispatch::{Dispatcher, DropDecision, WagonView};
use crate::simulation::messages::ShuntingCommand;
use bevy::prelude::*;
use std::collections::HashMap;

const LOCOMOTIVE_SIZE: Vec2 = Vec2::new(50.0, 26.0);
const LOCOMOTIVE_COLOR: Color = Color::srgb_u8(0x2B, 0x2B, 0x30);
const WAGON_SIZE: Vec2 = Vec2::new(44.0, 22.0);

const POOL_Z: f32 = 2.0;
const TRAIN_Z: f32 = 3.0;
const DRAG_Z: f32 = 4.0;

#[derive(Component)]
struct LocomotiveSprite;

#[derive(Component)]
#[require(Pickable)]
pub struct WagonSprite(pub WagonId);

/// Present while the player holds the wagon; the layout sync leaves it alone.
#[derive(Component)]
struct Dragged;

pub fn drop_decision(attached: bool, locomotive: Vec2, drop: Vec2, settings: &ShuntingSettings) -> DropDecision {
    let distance = locomotive.distance(drop);
    match attached {
        true if distance > settings.decouple_distance => DropDecision::Decouple,
        false if distance <= settings.couple_distance => DropDecision::Couple,
        _ => DropDecision::Return,
    }
}

fn get_wagon_bundle(wagon: &WagonView) -> impl Bundle {
    (
        WagonSprite(wagon.id),
        Sprite::from_color(wagon.wagon_type.color(), WAGON_SIZE),
        wagon_transform(wagon),
    )
}

fn wagon_transform(wagon: &WagonView) -> Transform {
    let z = if wagon.attached { TRAIN_Z } else { POOL_Z };
    Transform::from_translation(map_to_world(wagon.position).extend(z)).with_rotation(map_rotation(wagon.orientation))
}

pub struct ConsistDisplayPlugin;

impl Plugin for ConsistDisplayPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            Update,
            (
                spawn_consist.run_if(resource_added::<Dispatcher>),
                sync_layout.run_if(resource_exists::<Dispatcher>),
            )
                .chain(),
        );
    }
}

fn spawn_consist(dispatcher: Res<Dispatcher>, mut commands: Commands) {
    let state = dispatcher.render_state();
    commands.spawn((
        LocomotiveSprite,
        Sprite::from_color(LOCOMOTIVE_COLOR, LOCOMOTIVE_SIZE),
        Transform::from_translation(map_to_world(state.locomotive.position).extend(TRAIN_Z))
            .with_rotation(map_rotation(state.locomotive.orientation)),
        Pickable::IGNORE,
    ));

    for wagon in state.wagons() {
        commands
            .spawn(get_wagon_bundle(wagon))
            .observe(on_drag_start)
            .observe(on_drag)
            .observe(on_drag_end);
    }
}

fn sync_layout(
    dispatcher: Res<Dispatcher>,
    mut locomotive: Query<&mut Transform, With<LocomotiveSprite>>,
    mut wagons: Query<(&WagonSprite, &mut Transform), (Without<Dragged>, Without<LocomotiveSprite>)>,
) {
    let Ok(mut locomotive) = locomotive.single_mut() else {
        return;
    };
    let state = dispatcher.render_state();
    locomotive.translation = map_to_world(state.locomotive.position).extend(TRAIN_Z);
    locomotive.rotation = map_rotation(state.locomotive.orientation);

    let views: HashMap<WagonId, &WagonView> = state.wagons().map(|w| (w.id, w)).collect();
    for (wagon, mut transform) in &mut wagons {
        let view = views.get(&wagon.0).expect("wagon sprite without a wagon");
        let target = wagon_transform(view);
        if *transform != target {
            *transform = target;
        }
    }
}

fn on_drag_start(event: On<Pointer<DragStart>>, mut commands: Commands) {
    if event.button == PointerButton::Primary {
        commands.entity(event.entity).insert(Dragged);
    }
}

fn on_drag(
    event: On<Pointer<Drag>>,
    camera: Query<&Projection, With<MapCamera>>,
    mut wagons: Query<&mut Transform, (With<WagonSprite>, With<Dragged>)>,
) {
    let scale = camera.single().map_or(1.0, camera_scale);
    if let Ok(mut transform) = wagons.get_mut(event.entity) {
        transform.translation.x += event.delta.x * scale;
        transform.translation.y -= event.delta.y * scale;
        transform.translation.z = DRAG_Z;
    }
}

fn on_drag_end(
    event: On<Pointer<DragEnd>>,
    dispatcher: Res<Dispatcher>,
    wagons: Query<(&WagonSprite, &Transform), With<Dragged>>,
    mut shunting_commands: MessageWriter<ShuntingCommand>,
    mut commands: Commands,
) {
    let Ok((wagon, transform)) = wagons.get(event.entity) else {
        return;
    };
    commands.entity(event.entity).remove::<Dragged>();

    let locomotive = dispatcher.render_state().locomotive.position;
    let attached = dispatcher.engine().consist().wagon(wagon.0).is_attached();
    let drop = world_to_map(transform.translation.truncate());
    let decision = drop_decision(attached, locomotive, drop, dispatcher.settings());
    debug!("Wagon {} dropped at {}: {:?}", wagon.0, drop, decision);

    shunting_commands.write(ShuntingCommand::WagonDropped {
        wagon_id: wagon.0,
        decision,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drop_decision() {
        let settings = ShuntingSettings::default();
        let locomotive = vec2(100.0, 100.0);

        assert_eq!(
            drop_decision(true, locomotive, vec2(100.0, 105.0), &settings),
            DropDecision::Return
        );
        assert_eq!(
            drop_decision(true, locomotive, vec2(200.0, 100.0), &settings),
            DropDecision::Decouple
        );
        assert_eq!(
            drop_decision(false, locomotive, vec2(140.0, 100.0), &settings),
            DropDecision::Couple
        );
        assert_eq!(
            drop_decision(false, locomotive, vec2(300.0, 100.0), &settings),
            DropDecision::Return
        );
    }

    #[test]
    fn test_wagon_transform_layers() {
        let mut view = WagonView {
            id: 1,
            wagon_type: crate::common::WagonType::Red,
            position: vec2(10.0, 20.0),
            orientation: 0.0,
            attached: false,
        };
        assert_eq!(wagon_transform(&view).translation, vec3(10.0, -20.0, POOL_Z));
        view.attached = true;
        assert_eq!(wagon_transform(&view).translation, vec3(10.0, -20.0, TRAIN_Z));
    }
}
