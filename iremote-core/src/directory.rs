//! Snapshot download of every entity class.
//!
//! Classes are fetched in a fixed order, each with one count query and
//! one describe query per entity. A collection is emptied before its
//! download starts and installed whole once every record has arrived.

use bytes::Bytes;
use tracing::{debug, info};

use crate::error::Result;
use crate::message::Command;
use crate::model::{
    Alarm, AudioSource, AudioZone, Dimmer, Entity, EntityKind, Light, LogVar, Room, Scenario,
    SharedMirror, Shutter, Socket, Timer, with_mirror,
};
use crate::network::CommandChannel;
use crate::protocol::describe;

/// Number of classes in one download; each completed class is one
/// progress checkpoint.
pub const CLASS_COUNT: usize = EntityKind::DOWNLOAD_ORDER.len();

/// Percentage reported once `completed` classes have been installed.
pub fn checkpoint(completed: usize) -> u8 {
    ((completed.min(CLASS_COUNT) * 100 + CLASS_COUNT / 2) / CLASS_COUNT) as u8
}

/// Builds the mirror from the controller.
pub struct EntityDirectory<'a> {
    channel: &'a mut CommandChannel,
    mirror: &'a SharedMirror,
}

impl<'a> EntityDirectory<'a> {
    pub fn new(channel: &'a mut CommandChannel, mirror: &'a SharedMirror) -> Self {
        Self { channel, mirror }
    }

    /// Download every class, calling `progress` after each one.
    ///
    /// Any failure aborts the download and leaves the mirror partially
    /// populated; the caller must drop the connection.
    pub async fn download_all(&mut self, mut progress: impl FnMut(u8)) -> Result<()> {
        for (done, kind) in EntityKind::DOWNLOAD_ORDER.into_iter().enumerate() {
            self.download(kind).await?;
            progress(checkpoint(done + 1));
        }
        with_mirror(self.mirror, |m| m.audio_init_ok = false)
    }

    /// Replace one class in the mirror.
    pub async fn download(&mut self, kind: EntityKind) -> Result<()> {
        match kind {
            EntityKind::Socket => {
                self.replace_named::<Socket>(describe::SWITCH_LEN, |i, name, buf| {
                    describe::socket(i, name, buf)
                })
                .await
            }
            EntityKind::Light => {
                self.replace_named::<Light>(describe::SWITCH_LEN, |i, name, buf| {
                    describe::light(i, name, buf)
                })
                .await
            }
            EntityKind::LogVar => {
                self.replace_named::<LogVar>(describe::SWITCH_LEN, |i, name, buf| {
                    describe::logvar(i, name, buf)
                })
                .await
            }
            EntityKind::Dimmer => {
                self.replace_named::<Dimmer>(describe::DIMMER_LEN, |i, name, buf| {
                    describe::dimmer(i, name, buf)
                })
                .await
            }
            EntityKind::Shutter => {
                self.replace_named::<Shutter>(describe::SHUTTER_LEN, |i, name, _| {
                    Ok(describe::shutter(i, name))
                })
                .await
            }
            EntityKind::Room => self.replace_rooms().await,
            EntityKind::Alarm => {
                self.replace_named::<Alarm>(describe::ALARM_LEN, |i, name, buf| {
                    describe::alarm(i, name, buf)
                })
                .await
            }
            EntityKind::AudioZone => {
                self.replace_named::<AudioZone>(describe::AUDIO_ZONE_LEN, |i, name, buf| {
                    describe::audio_zone(i, name, buf)
                })
                .await
            }
            EntityKind::AudioSource => {
                self.replace_named::<AudioSource>(describe::AUDIO_SOURCE_LEN, |i, name, buf| {
                    describe::audio_source(i, name, buf)
                })
                .await
            }
            EntityKind::Scenario => {
                self.replace_named::<Scenario>(describe::SCENARIO_LEN, |i, name, buf| {
                    describe::scenario(i, name, buf)
                })
                .await
            }
            EntityKind::Timer => self.replace_timers().await,
            // Curve steps arrive with their rooms.
            EntityKind::CurveStep => Ok(()),
        }
    }

    async fn count(&mut self, kind: EntityKind) -> Result<usize> {
        let count = usize::from(self.channel.query_u16(&Command::Count(kind)).await?);
        debug!(%kind, count, "downloading");
        Ok(count)
    }

    /// Replace a class whose describe replies start with a name.
    async fn replace_named<T: Entity>(
        &mut self,
        record_len: usize,
        decode: impl Fn(usize, String, &mut Bytes) -> Result<T>,
    ) -> Result<()> {
        let kind = T::KIND;
        self.clear::<T>()?;
        let count = self.count(kind).await?;

        let mut items = Vec::with_capacity(count);
        for index in 0..count {
            self.channel.send(&Command::Describe { kind, index }).await?;
            let name = self.channel.read_name().await?;
            let mut record = self.channel.read_fixed(record_len).await?;
            items.push(decode(index, name, &mut record)?);
        }
        info!(%kind, count, "downloaded");
        self.install(items)
    }

    async fn replace_rooms(&mut self) -> Result<()> {
        let kind = EntityKind::Room;
        self.clear::<Room>()?;
        let count = self.count(kind).await?;

        let mut rooms = Vec::with_capacity(count);
        for index in 0..count {
            self.channel.send(&Command::Describe { kind, index }).await?;
            let name = self.channel.read_name().await?;
            let mut record = self.channel.read_fixed(describe::ROOM_LEN).await?;
            let describe::RoomRecord {
                mut room,
                curve_steps,
            } = describe::room(index, name, &mut record)?;

            for step in 0..usize::from(curve_steps) {
                self.channel
                    .send(&Command::DescribeCurveStep { room: index, step })
                    .await?;
                let mut buf = self.channel.read_fixed(describe::CURVE_STEP_LEN).await?;
                room.curve_steps
                    .push(describe::curve_step(index, step, &mut buf)?);
            }
            rooms.push(room);
        }
        info!(%kind, count, "downloaded");
        self.install(rooms)
    }

    async fn replace_timers(&mut self) -> Result<()> {
        let kind = EntityKind::Timer;
        self.clear::<Timer>()?;
        let count = self.count(kind).await?;

        let mut timers = Vec::with_capacity(count);
        for index in 0..count {
            self.channel.send(&Command::Describe { kind, index }).await?;
            let mut buf = self.channel.read_fixed(describe::TIMER_LEN).await?;
            let mut timer = describe::timer(index, &mut buf)?;

            self.channel
                .send(&Command::InstructionText(usize::from(timer.instruction)))
                .await?;
            timer.instruction_text = self.channel.read_text().await?;
            timers.push(timer);
        }
        info!(%kind, count, "downloaded");
        self.install(timers)
    }

    fn clear<T: Entity>(&self) -> Result<()> {
        with_mirror(self.mirror, |m| T::collection_mut(m).clear())
    }

    fn install<T: Entity>(&self, items: Vec<T>) -> Result<()> {
        with_mirror(self.mirror, |m| *T::collection_mut(m) = items)
    }
}
