use crate::common::WagonType;
use crate::simulation::dispatch::{Dispatcher, WagonCounts};
use crate::simulation::messages::{ShuntingCommand, ShuntingOutcome};
use bevy::prelude::*;

const PANEL_WIDTH: f32 = 240.0;
const PANEL_BACKGROUND: Color = Color::srgba(0.12, 0.12, 0.14, 0.9);
const BAR_UNIT: f32 = 24.0;
const BAR_HEIGHT: f32 = 14.0;
const BUTTON_DEFAULT: Color = Color::srgb(0.18, 0.45, 0.25);
const BUTTON_HOVERED: Color = Color::srgb(0.24, 0.58, 0.32);

#[derive(Component, Clone, Copy, PartialEq, Eq)]
enum PanelText {
    Title,
    Status,
    Train,
    LastEvent,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum BarScope {
    Station,
    Train,
}

#[derive(Component)]
struct Bar(BarScope, WagonType);

#[derive(Component)]
struct BarCount(BarScope, WagonType);

#[derive(Component)]
struct DepartButton;

pub struct InfoPanelPlugin;

impl Plugin for InfoPanelPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, setup).add_systems(
            Update,
            (
                (record_outcomes, refresh_panel).chain().run_if(resource_exists::<Dispatcher>),
                depart_button,
            ),
        );
    }
}

fn spawn_bar_chart(p: &mut ChildSpawnerCommands, scope: BarScope) {
    for wagon_type in WagonType::ALL {
        p.spawn(Node {
            align_items: AlignItems::Center,
            column_gap: px(6),
            ..default()
        })
        .with_children(|row| {
            row.spawn((
                Text::new(wagon_type.label()),
                TextFont::from_font_size(12.0),
                Node {
                    width: px(48),
                    ..default()
                },
            ));
            row.spawn((
                Bar(scope, wagon_type),
                Node {
                    width: px(0),
                    height: px(BAR_HEIGHT),
                    ..default()
                },
                BackgroundColor(wagon_type.color()),
            ));
            row.spawn((BarCount(scope, wagon_type), Text::new("0"), TextFont::from_font_size(12.0)));
        });
    }
}

fn setup(mut commands: Commands) {
    commands.spawn((
        Text::new(
            "Click a station to select it\n\
                  Enter or Depart to move, Escape to cancel\n\
                  Drag wagons to couple or decouple\n\
                  Up or Down to change the speed, P to pause\n\
                  Right-drag to pan, wheel to zoom",
        ),
        TextFont::from_font_size(14.0),
        Node {
            position_type: PositionType::Absolute,
            bottom: px(12),
            left: px(12),
            ..default()
        },
        Pickable::IGNORE,
    ));

    commands
        .spawn((
            Node {
                position_type: PositionType::Absolute,
                top: px(0),
                right: px(0),
                width: px(PANEL_WIDTH),
                height: vh(100.0),
                padding: UiRect::all(px(10)),
                row_gap: px(6),
                flex_direction: FlexDirection::Column,
                ..default()
            },
            BackgroundColor(PANEL_BACKGROUND),
            GlobalZIndex(10),
        ))
        .with_children(|p| {
            p.spawn((PanelText::Title, Text::new("No station selected"), TextFont::from_font_size(18.0)));
            p.spawn((PanelText::Status, Text::default(), TextFont::from_font_size(13.0)));
            spawn_bar_chart(p, BarScope::Station);
            p.spawn((
                DepartButton,
                Button,
                Node {
                    padding: UiRect::axes(px(12), px(6)),
                    justify_content: JustifyContent::Center,
                    ..default()
                },
                BackgroundColor(BUTTON_DEFAULT),
                Visibility::Hidden,
            ))
            .with_child((Text::new("Depart"), TextFont::from_font_size(14.0)));
            p.spawn((PanelText::Train, Text::default(), TextFont::from_font_size(16.0)));
            spawn_bar_chart(p, BarScope::Train);
            p.spawn((PanelText::LastEvent, Text::default(), TextFont::from_font_size(12.0)));
        });
}

fn describe_outcome(outcome: &ShuntingOutcome, dispatcher: &Dispatcher) -> Option<String> {
    let station_name = |id| dispatcher.engine().graph().station(id).name.clone();
    match outcome {
        ShuntingOutcome::StationSelected { .. } | ShuntingOutcome::CouplingClosed { .. } => None,
        ShuntingOutcome::MoveStarted { to, .. } => Some(format!("Departed to {}", station_name(*to))),
        ShuntingOutcome::Arrived { station_id } => Some(format!("Arrived at {}", station_name(*station_id))),
        ShuntingOutcome::CouplingOffered { station_id } => {
            Some(format!("Wagons waiting at {}", station_name(*station_id)))
        }
        ShuntingOutcome::Coupled(wagon_id) => Some(format!("Wagon {} coupled", wagon_id)),
        ShuntingOutcome::Decoupled { wagon_id, station_id } => {
            Some(format!("Wagon {} left at {}", wagon_id, station_name(*station_id)))
        }
        ShuntingOutcome::Disarmed => Some("Move cancelled".to_string()),
        ShuntingOutcome::Rejected(err) => Some(format!("Cannot do that: {}", err)),
    }
}

fn record_outcomes(
    dispatcher: Res<Dispatcher>,
    mut outcomes: MessageReader<ShuntingOutcome>,
    texts: Query<(&PanelText, &mut Text)>,
) {
    let Some(last) = outcomes.read().filter_map(|o| describe_outcome(o, &dispatcher)).last() else {
        return;
    };
    for (field, mut text) in texts {
        if *field == PanelText::LastEvent {
            text.0 = last.clone();
        }
    }
}

fn station_status(dispatcher: &Dispatcher) -> Option<(String, String, WagonCounts)> {
    let info = dispatcher.station_info(dispatcher.selected()?);
    let status = if dispatcher.armed() == Some(info.id) {
        "Ready to depart"
    } else if info.has_locomotive {
        "Locomotive is here"
    } else if dispatcher.engine().state().is_moving() {
        "Locomotive is on the way"
    } else {
        "Not reachable from here"
    };
    Some((info.name, status.to_string(), info.wagons))
}

fn refresh_panel(
    dispatcher: Res<Dispatcher>,
    mut texts: Query<(&PanelText, &mut Text), Without<BarCount>>,
    mut counts: Query<(&BarCount, &mut Text), Without<PanelText>>,
    mut bars: Query<(&Bar, &mut Node)>,
    mut button: Single<&mut Visibility, With<DepartButton>>,
) {
    if !dispatcher.is_changed() {
        return;
    }

    let (title, status, station_counts) = station_status(&dispatcher)
        .unwrap_or_else(|| ("No station selected".to_string(), String::new(), WagonCounts::default()));
    let train_counts = dispatcher.train_counts();
    let count_of = |scope, wagon_type| match scope {
        BarScope::Station => station_counts.get(wagon_type),
        BarScope::Train => train_counts.get(wagon_type),
    };

    for (field, mut text) in &mut texts {
        match field {
            PanelText::Title => text.0 = title.clone(),
            PanelText::Status => text.0 = status.clone(),
            PanelText::Train => text.0 = format!("Train: {} wagons", train_counts.total()),
            PanelText::LastEvent => {}
        }
    }
    for (count, mut text) in &mut counts {
        text.0 = count_of(count.0, count.1).to_string();
    }
    for (bar, mut node) in &mut bars {
        node.width = px(count_of(bar.0, bar.1) as f32 * BAR_UNIT);
    }

    **button = if dispatcher.armed().is_some() {
        Visibility::Inherited
    } else {
        Visibility::Hidden
    };
}

fn depart_button(
    buttons: Query<(&Interaction, &mut BackgroundColor), (Changed<Interaction>, With<DepartButton>)>,
    mut shunting_commands: MessageWriter<ShuntingCommand>,
) {
    for (interaction, mut color) in buttons {
        match interaction {
            Interaction::Pressed => {
                shunting_commands.write(ShuntingCommand::ConfirmMove);
            }
            Interaction::Hovered => color.0 = BUTTON_HOVERED,
            Interaction::None => color.0 = BUTTON_DEFAULT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::dispatch::tests::build_dispatcher;
    use crate::simulation::engine::ShuntingError;

    #[test]
    fn test_station_status() {
        let mut dispatcher = build_dispatcher();
        assert!(station_status(&dispatcher).is_none());

        dispatcher.on_station_clicked(2);
        let (title, status, counts) = station_status(&dispatcher).unwrap();
        assert_eq!(title, dispatcher.engine().graph().station(2).name);
        assert_eq!(status, "Ready to depart");
        assert_eq!(counts.get(WagonType::Yellow), 2);

        dispatcher.on_station_clicked(1);
        assert_eq!(station_status(&dispatcher).unwrap().1, "Locomotive is here");
    }

    #[test]
    fn test_describe_outcome() {
        let dispatcher = build_dispatcher();
        assert_eq!(
            describe_outcome(&ShuntingOutcome::Coupled(3), &dispatcher).as_deref(),
            Some("Wagon 3 coupled")
        );
        let rejected = ShuntingOutcome::Rejected(ShuntingError::NoMoveArmed);
        assert!(describe_outcome(&rejected, &dispatcher).unwrap().starts_with("Cannot do that"));
        assert!(describe_outcome(&ShuntingOutcome::Disarmed, &dispatcher).is_some());
    }
}
