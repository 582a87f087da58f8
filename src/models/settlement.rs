// Atomic multi-hop settlement of a route

use std::collections::BTreeMap;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::models::channel::{ChannelId, Side};
use crate::models::error::{PaymentError, RouteError};
use crate::models::network::Network;
use crate::models::routing::Route;

// Result of a settled payment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub amount: u64,
    pub total_fee: u64,
    pub hops: usize,
}

// Failure of the combined route-and-settle operation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PayError {
    #[error(transparent)]
    Route(#[from] RouteError),

    #[error(transparent)]
    Payment(#[from] PaymentError),
}

impl Network {
    /// Settle a route found by [`Network::find_path`].
    ///
    /// Liquidity is checked again for every hop because earlier payments may
    /// have moved balances since the route was computed. Validation runs over
    /// the whole route before anything is touched, so a failed payment leaves
    /// every channel exactly as it was.
    pub fn execute(&mut self, route: &Route) -> Result<Settlement, PaymentError> {
        let transfers = self.validate_route(route)?;

        for (channel_id, side, amount) in transfers {
            self.channels[channel_id.0].transfer(side, amount);
        }
        for hop in &route.hops {
            self.channels[hop.channel.0].credit_fee(hop.fee);
        }

        let settlement = Settlement {
            amount: route.amount,
            total_fee: route.total_fee(),
            hops: route.hop_count(),
        };
        debug!("Settled {} -> {}: {} sat, fee {}",
               route.source, route.destination, settlement.amount, settlement.total_fee);
        Ok(settlement)
    }

    /// Route and settle in one step.
    pub fn pay(&mut self, source: &str, destination: &str, amount: u64) -> Result<Settlement, PayError> {
        let route = self.find_path(source, destination, amount)?;
        Ok(self.execute(&route)?)
    }

    // Check the whole route without mutating anything. Demand is summed per
    // channel side so a route that reuses a channel cannot overdraw it.
    fn validate_route(&self, route: &Route) -> Result<Vec<(ChannelId, Side, u64)>, PaymentError> {
        if route.hops.is_empty() {
            return Err(PaymentError::InvalidRoute("route has no hops".to_string()));
        }
        if route.hops[0].from != route.source {
            return Err(PaymentError::InvalidRoute(format!("route does not start at {}", route.source)));
        }
        if route.hops[route.hops.len() - 1].to != route.destination {
            return Err(PaymentError::InvalidRoute(format!("route does not end at {}", route.destination)));
        }

        self.check_amounts(route)?;

        let mut demand: BTreeMap<(ChannelId, Side), u64> = BTreeMap::new();

        for (i, hop) in route.hops.iter().enumerate() {
            if i > 0 && route.hops[i - 1].to != hop.from {
                return Err(PaymentError::InvalidRoute(format!("hop {} does not continue from {}",
                                                              i, route.hops[i - 1].to)));
            }

            let channel = self.channel(hop.channel)
                .ok_or_else(|| PaymentError::InvalidRoute(format!("unknown channel {}", hop.channel)))?;
            let side = match channel.side_of(&hop.from) {
                Some(side) if channel.node_on(side.opposite()) == hop.to => side,
                _ => {
                    return Err(PaymentError::InvalidRoute(format!("{} does not connect {} and {}",
                                                                  hop.channel, hop.from, hop.to)));
                }
            };

            let required = demand.entry((hop.channel, side)).or_insert(0);
            *required = required.checked_add(hop.amount)
                .ok_or_else(|| PaymentError::InvalidRoute("hop amounts overflow".to_string()))?;

            let available = channel.balance_on(side);
            if *required > available {
                debug!("Insufficient liquidity on {}: need {}, have {}", hop.channel, required, available);
                return Err(PaymentError::InsufficientLiquidity {
                    channel: hop.channel,
                    required: *required,
                    available,
                });
            }
        }

        Ok(demand.into_iter().map(|((channel, side), amount)| (channel, side, amount)).collect())
    }

    // Hop amounts must follow the fee flow: walking back from the
    // destination, every hop past the first carries what arrives after it,
    // and the first hop carries that plus its own fee.
    fn check_amounts(&self, route: &Route) -> Result<(), PaymentError> {
        let overflow = || PaymentError::InvalidRoute("hop amounts overflow".to_string());
        let mut delivered = route.amount;

        for (i, hop) in route.hops.iter().enumerate().rev() {
            let with_fee = delivered.checked_add(hop.fee).ok_or_else(overflow)?;
            let expected = if i == 0 { with_fee } else { delivered };
            if hop.amount != expected {
                return Err(PaymentError::InvalidRoute(format!("hop {} carries {} sat, expected {}",
                                                              i, hop.amount, expected)));
            }
            delivered = with_fee;
        }

        Ok(())
    }
}
