//! Merchant directory over `foody_restaurants`.

use foody_core::error::MarketError;
use foody_core::store::{MerchantDirectory, StoreFuture};
use foody_core::types::{Restaurant, RestaurantId};

use crate::rows::{RestaurantRow, restaurant_columns};
use crate::{PostgresMarketStore, storage_error};

impl MerchantDirectory for PostgresMarketStore {
    fn insert_restaurant(&self, restaurant: Restaurant) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            sqlx::query(
                "INSERT INTO foody_restaurants
                    (id, api_key, title, phone, city, address, lat, lon, created_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
            )
            .bind(restaurant.id.as_str())
            .bind(restaurant.api_key.expose())
            .bind(&restaurant.title)
            .bind(&restaurant.phone)
            .bind(&restaurant.city)
            .bind(&restaurant.address)
            .bind(restaurant.lat)
            .bind(restaurant.lon)
            .bind(restaurant.created_at)
            .execute(&self.pool)
            .await
            .map_err(storage_error("failed to insert restaurant"))?;
            Ok(())
        })
    }

    fn find_restaurant(&self, id: &RestaurantId) -> StoreFuture<'_, Option<Restaurant>> {
        let id = id.clone();
        Box::pin(async move {
            let row: Option<RestaurantRow> = sqlx::query_as(concat!(
                "SELECT ",
                restaurant_columns!(),
                " FROM foody_restaurants WHERE id = $1"
            ))
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error("failed to load restaurant"))?;
            Ok(row.map(Restaurant::from))
        })
    }

    fn update_restaurant(&self, restaurant: Restaurant) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            let result = sqlx::query(
                "UPDATE foody_restaurants
                 SET title = $2, phone = $3, city = $4, address = $5, lat = $6, lon = $7
                 WHERE id = $1",
            )
            .bind(restaurant.id.as_str())
            .bind(&restaurant.title)
            .bind(&restaurant.phone)
            .bind(&restaurant.city)
            .bind(&restaurant.address)
            .bind(restaurant.lat)
            .bind(restaurant.lon)
            .execute(&self.pool)
            .await
            .map_err(storage_error("failed to update restaurant"))?;

            if result.rows_affected() == 0 {
                return Err(MarketError::not_found("restaurant", restaurant.id.as_str()));
            }
            Ok(())
        })
    }

    fn find_restaurant_by_phone(&self, phone: &str) -> StoreFuture<'_, Option<Restaurant>> {
        let phone = phone.to_string();
        Box::pin(async move {
            let row: Option<RestaurantRow> = sqlx::query_as(concat!(
                "SELECT ",
                restaurant_columns!(),
                " FROM foody_restaurants WHERE phone = $1 ORDER BY created_at DESC LIMIT 1"
            ))
            .bind(&phone)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error("failed to look up restaurant by phone"))?;
            Ok(row.map(Restaurant::from))
        })
    }
}
