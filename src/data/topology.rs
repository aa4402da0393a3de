//! Discovered GATT topology of a connected device.
//!
//! Filled in stages as discovery completions arrive: services first, then
//! characteristics and included services per service, then descriptors per
//! characteristic. Sets are ordered so that displays are stable.

use std::collections::{BTreeMap, BTreeSet};

use crate::ble::ids::{CharacteristicId, DescriptorId, ServiceId};

/// What is known about one service.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ServiceEntry {
    /// Characteristics of the service.
    pub characteristics: BTreeSet<CharacteristicId>,
    /// Services included by the service.
    pub included_services: BTreeSet<ServiceId>,
}

/// Service, characteristic and descriptor layout of a peripheral.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Topology {
    services: BTreeMap<ServiceId, ServiceEntry>,
    descriptors: BTreeMap<CharacteristicId, BTreeSet<DescriptorId>>,
}

impl Topology {
    /// Create an empty topology.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if nothing has been discovered.
    pub fn is_empty(&self) -> bool {
        self.services.is_empty() && self.descriptors.is_empty()
    }

    /// Forget everything.
    pub fn clear(&mut self) {
        self.services.clear();
        self.descriptors.clear();
    }

    /// Replace the service list.
    ///
    /// Everything hanging off the old services is dropped; the following
    /// discovery round repopulates it.
    pub fn replace_services(&mut self, services: impl IntoIterator<Item = ServiceId>) {
        self.clear();
        for service in services {
            self.services.entry(service).or_default();
        }
    }

    /// Record the characteristics of a service.
    pub fn set_characteristics(
        &mut self,
        service: ServiceId,
        characteristics: impl IntoIterator<Item = CharacteristicId>,
    ) {
        let characteristics: BTreeSet<_> = characteristics.into_iter().collect();
        self.descriptors
            .retain(|c, _| c.service != service || characteristics.contains(c));
        self.services.entry(service).or_default().characteristics = characteristics;
    }

    /// Record the included services of a service.
    pub fn set_included_services(
        &mut self,
        service: ServiceId,
        included: impl IntoIterator<Item = ServiceId>,
    ) {
        self.services.entry(service).or_default().included_services =
            included.into_iter().collect();
    }

    /// Record the descriptors of a characteristic.
    pub fn set_descriptors(
        &mut self,
        characteristic: CharacteristicId,
        descriptors: impl IntoIterator<Item = DescriptorId>,
    ) {
        self.descriptors
            .insert(characteristic, descriptors.into_iter().collect());
    }

    /// Discovered services in UUID order.
    pub fn services(&self) -> impl Iterator<Item = &ServiceId> {
        self.services.keys()
    }

    /// Number of discovered services.
    pub fn service_count(&self) -> usize {
        self.services.len()
    }

    /// Full entry for a service.
    pub fn service(&self, service: &ServiceId) -> Option<&ServiceEntry> {
        self.services.get(service)
    }

    /// Characteristics of a service (empty if unknown).
    pub fn characteristics(&self, service: &ServiceId) -> Vec<CharacteristicId> {
        self.services
            .get(service)
            .map(|e| e.characteristics.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Included services of a service (empty if unknown).
    pub fn included_services(&self, service: &ServiceId) -> Vec<ServiceId> {
        self.services
            .get(service)
            .map(|e| e.included_services.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Descriptors of a characteristic (empty if unknown).
    pub fn descriptors(&self, characteristic: &CharacteristicId) -> Vec<DescriptorId> {
        self.descriptors
            .get(characteristic)
            .map(|d| d.iter().copied().collect())
            .unwrap_or_default()
    }
}
