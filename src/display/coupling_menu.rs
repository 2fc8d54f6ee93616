use crate::common::{StationId, WagonId, WagonType};
use crate::simulation::dispatch::Dispatcher;
use crate::simulation::messages::{ShuntingCommand, ShuntingOutcome};
use bevy::prelude::*;
use std::ops::DerefMut;

const MENU_BACKGROUND_DEFAULT: BackgroundColor = BackgroundColor(Color::srgb(0.15, 0.15, 0.15));
const MENU_BACKGROUND_HIGHLIGHT: BackgroundColor = BackgroundColor(Color::srgb(0.31, 0.31, 0.31));

#[derive(Component)]
struct CouplingMenu;

#[derive(Component, Clone, Copy, Debug, PartialEq, Eq)]
#[require(Pickable)]
enum CouplingItem {
    Wagon(WagonId),
    Leave,
}

impl CouplingItem {
    fn command(&self) -> ShuntingCommand {
        match self {
            CouplingItem::Wagon(wagon_id) => ShuntingCommand::CoupleOffered(*wagon_id),
            CouplingItem::Leave => ShuntingCommand::LeaveOffered,
        }
    }
}

fn list_items(dispatcher: &Dispatcher, station_id: StationId) -> Vec<(CouplingItem, String, Option<WagonType>)> {
    dispatcher
        .engine()
        .consist()
        .wagons_at(station_id)
        .map(|w| {
            let label = format!("Wagon {} ({})", w.id, w.wagon_type);
            (CouplingItem::Wagon(w.id), label, Some(w.wagon_type))
        })
        .chain(std::iter::once((CouplingItem::Leave, "Leave".to_string(), None)))
        .collect()
}

pub struct CouplingMenuPlugin;

impl Plugin for CouplingMenuPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, setup)
            .add_systems(Update, update_menu.run_if(resource_exists::<Dispatcher>));
    }
}

fn setup(mut commands: Commands) {
    commands.spawn((
        CouplingMenu,
        Node {
            position_type: PositionType::Absolute,
            top: px(60),
            left: px(60),
            border: UiRect::all(px(1)),
            padding: UiRect::all(px(4)),
            flex_direction: FlexDirection::Column,
            ..default()
        },
        MENU_BACKGROUND_DEFAULT,
        BorderColor::all(Color::WHITE),
        BorderRadius::all(px(3.0)),
        GlobalZIndex(100),
        Visibility::Hidden,
    ));
}

fn update_menu(
    dispatcher: Res<Dispatcher>,
    mut outcomes: MessageReader<ShuntingOutcome>,
    mut menu: Single<(Entity, &mut Visibility), With<CouplingMenu>>,
    mut commands: Commands,
) {
    let refreshes = outcomes
        .read()
        .filter(|outcome| {
            matches!(
                outcome,
                ShuntingOutcome::CouplingOffered { .. }
                    | ShuntingOutcome::CouplingClosed { .. }
                    | ShuntingOutcome::Coupled(_)
                    | ShuntingOutcome::Decoupled { .. }
                    | ShuntingOutcome::MoveStarted { .. }
            )
        })
        .count();
    if refreshes == 0 {
        return;
    }

    let (entity, vis) = menu.deref_mut();
    let Some(station_id) = dispatcher.coupling_offer() else {
        **vis = Visibility::Hidden;
        return;
    };

    let title = format!("Couple at {}?", dispatcher.engine().graph().station(station_id).name);
    commands
        .entity(*entity)
        .despawn_related::<Children>()
        .with_children(|p| {
            p.spawn((Text::new(title), TextFont::from_font_size(14.0), Pickable::IGNORE));
            for (item, label, wagon_type) in list_items(&dispatcher, station_id) {
                p.spawn((
                    Node {
                        padding: UiRect::all(px(4.0)),
                        column_gap: px(6),
                        align_items: AlignItems::Center,
                        ..default()
                    },
                    item,
                ))
                .observe(on_menu_hover)
                .observe(on_menu_out)
                .observe(on_item_click)
                .with_children(|row| {
                    if let Some(wagon_type) = wagon_type {
                        row.spawn((
                            Node {
                                width: px(12),
                                height: px(12),
                                ..default()
                            },
                            BackgroundColor(wagon_type.color()),
                            Pickable::IGNORE,
                        ));
                    }
                    row.spawn((Text::new(label), TextFont::from_font_size(12.0), Pickable::IGNORE));
                });
            }
        });
    **vis = Visibility::Visible;
}

fn on_item_click(
    event: On<Pointer<Click>>,
    items: Query<&CouplingItem>,
    mut shunting_commands: MessageWriter<ShuntingCommand>,
) {
    if event.button != PointerButton::Primary {
        return;
    }
    if let Ok(item) = items.get(event.entity) {
        debug!("Coupling menu choice {:?}", item);
        shunting_commands.write(item.command());
    }
}

fn on_menu_hover(event: On<Pointer<Over>>, mut commands: Commands) {
    commands.entity(event.entity).insert(MENU_BACKGROUND_HIGHLIGHT);
}

fn on_menu_out(event: On<Pointer<Out>>, mut commands: Commands) {
    commands.entity(event.entity).remove::<BackgroundColor>();
}
